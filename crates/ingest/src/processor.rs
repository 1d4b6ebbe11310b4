//! Per-message processing: notification → object → features → rows.

use tracing::{info, warn};

use geoingest_core::parse_feature_document;
use geoingest_queue::{route, ObjectTarget, Route, S3EventNotification};
use geoingest_storage::ObjectFetcher;

use crate::error::IngestError;
use crate::writer::FeatureWriter;

/// What one successfully processed message amounted to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub objects_ingested: usize,
    pub features_written: usize,
    pub records_skipped: usize,
}

/// Turns a notification body into committed feature rows.
///
/// Records are handled in order and the first failure aborts the message.
/// Objects already committed by earlier records stay committed, so a
/// redelivered message may insert them again.
pub struct MessageProcessor<F, W> {
    fetcher: F,
    writer: W,
}

impl<F, W> MessageProcessor<F, W>
where
    F: ObjectFetcher,
    W: FeatureWriter,
{
    pub fn new(fetcher: F, writer: W) -> Self {
        Self { fetcher, writer }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Process one message body. `Ok` means the message may be acked.
    pub async fn process(&self, body: &str) -> Result<ProcessSummary, IngestError> {
        let notification = S3EventNotification::from_body(body).map_err(IngestError::MessageBody)?;

        let mut summary = ProcessSummary::default();
        let records = notification.records();
        if records.is_empty() {
            info!(
                event = notification.event.as_deref().unwrap_or("<none>"),
                "Skipping non-record message type"
            );
            return Ok(summary);
        }

        for record in records {
            match route(record) {
                Route::Skip(reason) => {
                    info!(%reason, "Skipping record");
                    summary.records_skipped += 1;
                }
                Route::Ingest(target) => {
                    summary.features_written += self.ingest_object(&target).await?;
                    summary.objects_ingested += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Fetch, validate, and persist one object. Returns the rows written.
    pub async fn ingest_object(&self, target: &ObjectTarget) -> Result<usize, IngestError> {
        info!(%target, "Downloading");
        let text = self
            .fetcher
            .fetch_text(&target.bucket, &target.key)
            .await
            .map_err(|source| IngestError::Fetch {
                target: target.clone(),
                source,
            })?;

        let features = parse_feature_document(&text).map_err(|source| IngestError::Document {
            target: target.clone(),
            source,
        })?;

        if features.is_empty() {
            warn!(%target, "Document has no features");
        }

        let written = self
            .writer
            .write(&target.bucket, &target.key, &features)
            .await
            .map_err(|source| IngestError::Write {
                target: target.clone(),
                source,
            })?;

        info!(%target, features = written, "Inserted {written} features");
        Ok(written)
    }
}
