//! Whole-file JSON persistence for model artifacts and dataset dumps.
//!
//! Stages hand data to each other only through complete files: the
//! producer writes the entire payload, the consumer reads it fully before
//! using it.

use crate::prelude::CoreResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub fn save_json<T: Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let payload = serde_json::to_vec_pretty(value)?;
    fs::write(path, payload)?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> CoreResult<T> {
    let contents = fs::read(path)?;
    Ok(serde_json::from_slice(&contents)?)
}
