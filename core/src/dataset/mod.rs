pub mod lifetime;
pub mod root_cause;
pub mod sequence;
pub mod split;

pub use lifetime::{build_lifetime_dataset, LifetimeDataset};
pub use root_cause::{build_root_cause_dataset, RootCauseDataset};
pub use sequence::{build_sequence_dataset, SequenceDataset};
pub use split::{split_indices, stratified_indices, SequenceSplit, TabularSplit};
