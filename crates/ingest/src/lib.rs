pub mod db;
pub mod error;
pub mod processor;
pub mod worker;
pub mod writer;

pub use error::IngestError;
pub use processor::{MessageProcessor, ProcessSummary};
pub use worker::{BatchOutcome, ConsumerLoop};
pub use writer::{FeatureWriter, PgFeatureWriter, WriteError};
