//! The long-running consume loop.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use geoingest_queue::{QueueConsumer, QueueError, QueueMessage, ReceiveOptions};
use geoingest_storage::ObjectFetcher;

use crate::processor::MessageProcessor;
use crate::writer::FeatureWriter;

/// Result of one receive-and-process round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub received: usize,
    pub acked: usize,
    pub failed: usize,
}

/// Polls the queue and acks exactly the messages that processed cleanly.
///
/// A failed message is left alone and comes back after its visibility
/// timeout, which makes delivery at-least-once.
pub struct ConsumerLoop<Q, F, W> {
    queue: Q,
    processor: MessageProcessor<F, W>,
    receive: ReceiveOptions,
    poll_error_delay: Duration,
}

impl<Q, F, W> ConsumerLoop<Q, F, W>
where
    Q: QueueConsumer,
    F: ObjectFetcher,
    W: FeatureWriter,
{
    pub fn new(
        queue: Q,
        processor: MessageProcessor<F, W>,
        receive: ReceiveOptions,
        poll_error_delay: Duration,
    ) -> Self {
        Self {
            queue,
            processor,
            receive,
            poll_error_delay,
        }
    }

    pub fn processor(&self) -> &MessageProcessor<F, W> {
        &self.processor
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Receive one batch and process its messages sequentially.
    pub async fn poll_once(&self) -> Result<BatchOutcome, QueueError> {
        let messages = self.queue.poll_batch(&self.receive).await?;

        let mut outcome = BatchOutcome {
            received: messages.len(),
            ..BatchOutcome::default()
        };

        for message in &messages {
            if self.handle_message(message).await {
                outcome.acked += 1;
            } else {
                outcome.failed += 1;
            }
        }

        if outcome.received > 0 {
            info!(
                received = outcome.received,
                acked = outcome.acked,
                failed = outcome.failed,
                "Processed queue batch"
            );
        }
        Ok(outcome)
    }

    /// Returns true when the message was processed and acked.
    async fn handle_message(&self, message: &QueueMessage) -> bool {
        debug!(
            message_id = %message.id,
            attempt = message.attempt_count,
            sent_at = %message.timestamp,
            queue_age_ms = message.age_ms(),
            "Processing message"
        );

        match self.processor.process(&message.body).await {
            Ok(summary) => {
                if let Err(e) = self.queue.ack(&message.receipt_handle).await {
                    warn!(message_id = %message.id, error = %e, "Failed to ack message");
                    return false;
                }
                debug!(
                    message_id = %message.id,
                    objects = summary.objects_ingested,
                    features = summary.features_written,
                    skipped = summary.records_skipped,
                    "Acked message"
                );
                true
            }
            Err(e) => {
                error!(
                    message_id = %message.id,
                    attempt = message.attempt_count,
                    queue_age_ms = message.age_ms(),
                    validation = e.is_validation(),
                    error = %e,
                    "Failed to process message; leaving it for redelivery"
                );
                false
            }
        }
    }

    /// Consume forever. Receive failures are logged and retried after
    /// `poll_error_delay`; nothing here terminates the loop.
    pub async fn run(&self) {
        info!(
            max_messages = self.receive.max_messages,
            wait_secs = self.receive.wait_time_secs,
            visibility_secs = self.receive.visibility_timeout_secs,
            "Worker started. Polling for GeoJSON ingest events"
        );

        loop {
            if let Err(e) = self.poll_once().await {
                warn!(
                    error = %e,
                    delay_ms = self.poll_error_delay.as_millis() as u64,
                    "Queue receive failed"
                );
                tokio::time::sleep(self.poll_error_delay).await;
            }
        }
    }
}
