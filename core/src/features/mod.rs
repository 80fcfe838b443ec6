pub mod engineer;

pub use engineer::{
    engineer_features, feature_columns, FeatureTable, DEFAULT_ROLLING_WINDOW, RATIO_EPSILON,
};
