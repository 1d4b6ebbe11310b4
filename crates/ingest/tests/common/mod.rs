//! In-process fakes for the queue, the object store and the database.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use serde_json::{json, Map, Value};

use geoingest_core::FeatureRecord;
use geoingest_ingest::{ConsumerLoop, FeatureWriter, MessageProcessor, WriteError};
use geoingest_queue::{QueueConsumer, QueueError, QueueMessage, ReceiveOptions};
use geoingest_storage::ObjectStoreFetcher;

pub const BUCKET: &str = "geo-uploads";

// ── Queue ───────────────────────────────────────────────────────────

/// Hands out pre-scripted receive results, then empty batches.
#[derive(Default)]
pub struct ScriptedQueue {
    batches: Mutex<VecDeque<Result<Vec<QueueMessage>, QueueError>>>,
    acked: Mutex<Vec<String>>,
    polls: Mutex<Vec<ReceiveOptions>>,
    fail_acks: bool,
}

impl ScriptedQueue {
    pub fn new(batches: Vec<Result<Vec<QueueMessage>, QueueError>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            ..Self::default()
        }
    }

    pub fn with_failing_acks(mut self) -> Self {
        self.fail_acks = true;
        self
    }

    pub fn acked(&self) -> Vec<String> {
        self.acked.lock().unwrap().clone()
    }

    pub fn polls(&self) -> Vec<ReceiveOptions> {
        self.polls.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl QueueConsumer for ScriptedQueue {
    async fn poll_batch(&self, opts: &ReceiveOptions) -> Result<Vec<QueueMessage>, QueueError> {
        self.polls.lock().unwrap().push(*opts);
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => {
                // Stand-in for the long-poll wait so a running loop yields.
                tokio::task::yield_now().await;
                Ok(Vec::new())
            }
        }
    }

    async fn ack(&self, receipt_handle: &str) -> Result<(), QueueError> {
        if self.fail_acks {
            return Err(QueueError::Ack(format!("{receipt_handle}: receipt handle expired")));
        }
        self.acked.lock().unwrap().push(receipt_handle.to_string());
        Ok(())
    }
}

pub fn message(id: &str, body: impl Into<String>) -> QueueMessage {
    QueueMessage {
        id: id.to_string(),
        body: body.into(),
        receipt_handle: receipt(id),
        timestamp: Utc::now(),
        attempt_count: 1,
    }
}

pub fn receipt(id: &str) -> String {
    format!("rh-{id}")
}

/// An `ObjectCreated:Put` notification naming each (bucket, raw key).
pub fn created_body(objects: &[(&str, &str)]) -> String {
    let records: Vec<Value> = objects
        .iter()
        .map(|(bucket, key)| {
            json!({
                "eventName": "ObjectCreated:Put",
                "s3": {"bucket": {"name": bucket}, "object": {"key": key}}
            })
        })
        .collect();
    json!({ "Records": records }).to_string()
}

// ── Object store ────────────────────────────────────────────────────

pub async fn bucket_with(objects: &[(&str, &str)]) -> Arc<dyn ObjectStore> {
    let store = InMemory::new();
    for (key, body) in objects {
        store
            .put(&Path::parse(*key).unwrap(), PutPayload::from(body.as_bytes().to_vec()))
            .await
            .unwrap();
    }
    Arc::new(store)
}

pub async fn fetcher_with(objects: &[(&str, &str)]) -> ObjectStoreFetcher {
    ObjectStoreFetcher::fixed().with_store(BUCKET, bucket_with(objects).await)
}

// ── Database ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub source_bucket: String,
    pub source_key: String,
    pub feature_index: i32,
    pub properties: Map<String, Value>,
    pub geometry: Value,
}

/// Collects committed rows; a configured failure discards the whole object.
#[derive(Default)]
pub struct RecordingWriter {
    rows: Mutex<Vec<Row>>,
    fail_key: Option<String>,
    fail_index: Option<usize>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every object fails when it reaches feature `index`.
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_index: Some(index),
            ..Self::default()
        }
    }

    /// Only `key` fails, on its first feature.
    pub fn failing_on(key: &str) -> Self {
        Self {
            fail_key: Some(key.to_string()),
            fail_index: Some(0),
            ..Self::default()
        }
    }

    pub fn rows(&self) -> Vec<Row> {
        self.rows.lock().unwrap().clone()
    }

    fn fails(&self, key: &str, index: usize) -> bool {
        let key_matches = self.fail_key.as_deref().map_or(true, |k| k == key);
        key_matches && self.fail_index == Some(index)
    }
}

#[async_trait]
impl FeatureWriter for RecordingWriter {
    async fn write(
        &self,
        bucket: &str,
        key: &str,
        features: &[FeatureRecord],
    ) -> Result<usize, WriteError> {
        let mut staged = Vec::with_capacity(features.len());
        for (index, feature) in features.iter().enumerate() {
            if self.fails(key, index) {
                return Err(WriteError::Insert {
                    index,
                    source: sqlx::Error::Protocol("invalid geometry".to_string()),
                });
            }
            staged.push(Row {
                source_bucket: bucket.to_string(),
                source_key: key.to_string(),
                feature_index: index as i32,
                properties: feature.properties.clone(),
                geometry: feature.geometry.clone(),
            });
        }

        self.rows.lock().unwrap().extend(staged);
        Ok(features.len())
    }
}

// ── Wiring ──────────────────────────────────────────────────────────

pub type TestLoop = ConsumerLoop<ScriptedQueue, ObjectStoreFetcher, RecordingWriter>;

pub fn receive_options() -> ReceiveOptions {
    ReceiveOptions {
        max_messages: 5,
        wait_time_secs: 10,
        visibility_timeout_secs: 30,
    }
}

pub fn consumer_loop(
    queue: ScriptedQueue,
    fetcher: ObjectStoreFetcher,
    writer: RecordingWriter,
) -> TestLoop {
    ConsumerLoop::new(
        queue,
        MessageProcessor::new(fetcher, writer),
        receive_options(),
        Duration::from_millis(1),
    )
}

pub fn point_feature(x: f64, y: f64, name: &str) -> Value {
    json!({
        "type": "Feature",
        "geometry": {"type": "Point", "coordinates": [x, y]},
        "properties": {"name": name}
    })
}

pub fn collection(features: Vec<Value>) -> String {
    json!({"type": "FeatureCollection", "features": features}).to_string()
}
