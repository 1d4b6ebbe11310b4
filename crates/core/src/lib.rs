pub mod config;
pub mod error;
pub mod geojson;
pub mod retry;

pub use config::Config;
pub use error::*;
pub use geojson::{parse_feature_document, FeatureRecord};
pub use retry::{retry, RetryPolicy};
