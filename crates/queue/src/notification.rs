//! S3 event notification wire format.
//!
//! ```json
//! {"Records": [{"eventName": "ObjectCreated:Put",
//!               "s3": {"bucket": {"name": "geo"}, "object": {"key": "a.geojson"}}}]}
//! ```
//!
//! Bodies without `Records` (e.g. the `s3:TestEvent` sent when a bucket
//! notification is configured) decode with `records == None`.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3EventNotification {
    #[serde(rename = "Records", default)]
    pub records: Option<Vec<NotificationRecord>>,
    /// Present on non-record notifications such as `s3:TestEvent`.
    #[serde(rename = "Event", default)]
    pub event: Option<String>,
}

impl S3EventNotification {
    pub fn from_body(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Records to process; empty for non-record notifications.
    pub fn records(&self) -> &[NotificationRecord] {
        self.records.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub s3: Option<S3Entity>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3Entity {
    #[serde(default)]
    pub bucket: Option<BucketEntity>,
    #[serde(default)]
    pub object: Option<ObjectEntity>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BucketEntity {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectEntity {
    /// Percent-encoded object key, `+` standing for space.
    #[serde(default)]
    pub key: Option<String>,
}

impl NotificationRecord {
    pub fn event_name(&self) -> &str {
        self.event_name.as_deref().unwrap_or("")
    }

    pub fn bucket_name(&self) -> Option<&str> {
        self.s3.as_ref()?.bucket.as_ref()?.name.as_deref()
    }

    pub fn raw_key(&self) -> Option<&str> {
        self.s3.as_ref()?.object.as_ref()?.key.as_deref()
    }
}
