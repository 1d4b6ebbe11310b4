pub mod consumer;
pub mod error;
pub mod notification;
pub mod router;
pub mod sqs;

pub use consumer::{QueueConsumer, QueueMessage, ReceiveOptions};
pub use error::QueueError;
pub use notification::{NotificationRecord, S3EventNotification};
pub use router::{route, ObjectTarget, Route, SkipReason};
pub use sqs::SqsConsumer;
