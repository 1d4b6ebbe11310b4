pub mod backend;
pub mod error;
pub mod fetcher;

pub use backend::build_s3_store;
pub use error::StorageError;
pub use fetcher::{ObjectFetcher, ObjectStoreFetcher};
