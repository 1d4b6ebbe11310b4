//! AWS SQS consumer implementation.

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_sqs::config::BehaviorVersion;
use aws_sdk_sqs::types::{Message, MessageSystemAttributeName};
use aws_sdk_sqs::Client;
use chrono::{TimeZone, Utc};
use tracing::{debug, info, warn};

use geoingest_core::config::{
    AwsConfig, QueueConfig, MAX_RECEIVE_BATCH, MAX_VISIBILITY_TIMEOUT_SECS, MAX_WAIT_TIME_SECS,
};

use crate::consumer::{QueueConsumer, QueueMessage, ReceiveOptions};
use crate::error::QueueError;

/// SQS-backed queue consumer.
pub struct SqsConsumer {
    client: Client,
    queue_url: String,
}

impl SqsConsumer {
    /// Build the client and resolve the queue URL.
    ///
    /// Fails with [`QueueError::NotFound`] while the queue does not exist yet;
    /// callers wrap this in a startup retry.
    pub async fn connect(aws: &AwsConfig, queue: &QueueConfig) -> Result<Self, QueueError> {
        let client = build_client(aws);

        let queue_url = match &queue.queue_url {
            Some(url) => url.clone(),
            None => resolve_queue_url(&client, &queue.queue_name).await?,
        };

        info!(
            queue_url = %queue_url,
            region = %aws.region,
            "SQS consumer initialized"
        );

        Ok(Self { client, queue_url })
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

/// Build the SQS client directly from config.
///
/// Does not use `aws_config::defaults()`, which would pick up ambient
/// credentials and endpoints from the environment instead of ours.
fn build_client(aws: &AwsConfig) -> Client {
    let region = aws_sdk_sqs::config::Region::new(aws.region.clone());

    let mut sqs_config = aws_sdk_sqs::Config::builder()
        .region(region)
        .behavior_version(BehaviorVersion::latest());

    if let (Some(key_id), Some(secret)) = (&aws.access_key_id, &aws.secret_access_key) {
        let creds = Credentials::new(
            key_id,
            secret,
            aws.session_token.clone(),
            None,
            "geoingest-static",
        );
        sqs_config = sqs_config.credentials_provider(creds);
    }

    if let Some(endpoint) = aws.endpoint() {
        sqs_config = sqs_config.endpoint_url(endpoint);
    }

    Client::from_conf(sqs_config.build())
}

/// Convert one received SQS message. Messages without a receipt handle
/// cannot be acked and are dropped with a warning.
fn to_queue_message(msg: Message) -> Option<QueueMessage> {
    let id = msg.message_id().unwrap_or("unknown").to_string();

    let Some(receipt_handle) = msg.receipt_handle().map(str::to_string) else {
        warn!(message_id = %id, "Skipping SQS message without receipt handle");
        return None;
    };

    let attribute = |name: MessageSystemAttributeName| {
        msg.attributes().and_then(|attrs| attrs.get(&name)).cloned()
    };

    // SentTimestamp is epoch millis.
    let timestamp = attribute(MessageSystemAttributeName::SentTimestamp)
        .and_then(|ts| ts.parse::<i64>().ok())
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(Utc::now);

    let attempt_count = attribute(MessageSystemAttributeName::ApproximateReceiveCount)
        .and_then(|c| c.parse::<u32>().ok())
        .unwrap_or(1);

    Some(QueueMessage {
        id,
        body: msg.body().unwrap_or("").to_string(),
        receipt_handle,
        timestamp,
        attempt_count,
    })
}

/// Look up a queue URL by name.
pub async fn resolve_queue_url(client: &Client, queue_name: &str) -> Result<String, QueueError> {
    let resp = client
        .get_queue_url()
        .queue_name(queue_name)
        .send()
        .await
        .map_err(|e| QueueError::NotFound(format!("{queue_name}: {e:?}")))?;

    resp.queue_url()
        .map(str::to_string)
        .ok_or_else(|| QueueError::NotFound(format!("{queue_name}: empty queue URL")))
}

#[async_trait]
impl QueueConsumer for SqsConsumer {
    async fn poll_batch(&self, opts: &ReceiveOptions) -> Result<Vec<QueueMessage>, QueueError> {
        let capped = opts.max_messages.clamp(1, MAX_RECEIVE_BATCH) as i32;

        debug!(max_messages = capped, wait_secs = opts.wait_time_secs, "Polling SQS");

        let resp = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(capped)
            .wait_time_seconds(opts.wait_time_secs.min(MAX_WAIT_TIME_SECS) as i32)
            .visibility_timeout(opts.visibility_timeout_secs.min(MAX_VISIBILITY_TIMEOUT_SECS) as i32)
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .send()
            .await
            .map_err(|e| QueueError::Connection(format!("SQS receive failed: {e:?}")))?;

        let sqs_messages = resp.messages.unwrap_or_default();
        debug!(count = sqs_messages.len(), "Received SQS messages");

        let messages: Vec<QueueMessage> =
            sqs_messages.into_iter().filter_map(to_queue_message).collect();

        Ok(messages)
    }

    async fn ack(&self, receipt_handle: &str) -> Result<(), QueueError> {
        debug!(receipt_handle, "Acking SQS message");

        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::Ack(format!("SQS delete failed: {e:?}")))?;

        Ok(())
    }
}
