//! Decides which notification records name a GeoJSON object to ingest.

use std::fmt;

use crate::notification::NotificationRecord;

/// Event name prefix shared by every S3 object-creation event.
pub const OBJECT_CREATED_PREFIX: &str = "ObjectCreated";

/// Object key suffix accepted for ingestion (compared case-insensitively).
pub const GEOJSON_EXTENSION: &str = ".geojson";

/// A bucket/key pair to fetch and ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectTarget {
    pub bucket: String,
    /// Decoded object key.
    pub key: String,
}

impl fmt::Display for ObjectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Why a record was filtered out. Skips are normal outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnsupportedEvent(String),
    MissingLocation,
    NotGeoJson(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnsupportedEvent(name) => write!(f, "unsupported event {name:?}"),
            SkipReason::MissingLocation => write!(f, "record without bucket/key"),
            SkipReason::NotGeoJson(key) => write!(f, "non-GeoJSON object {key:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Ingest(ObjectTarget),
    Skip(SkipReason),
}

impl Route {
    pub fn target(&self) -> Option<&ObjectTarget> {
        match self {
            Route::Ingest(target) => Some(target),
            Route::Skip(_) => None,
        }
    }
}

/// Route one notification record.
pub fn route(record: &NotificationRecord) -> Route {
    let event_name = record.event_name();
    if !event_name.starts_with(OBJECT_CREATED_PREFIX) {
        return Route::Skip(SkipReason::UnsupportedEvent(event_name.to_string()));
    }

    let (Some(bucket), Some(raw_key)) = (record.bucket_name(), record.raw_key()) else {
        return Route::Skip(SkipReason::MissingLocation);
    };
    if bucket.is_empty() || raw_key.is_empty() {
        return Route::Skip(SkipReason::MissingLocation);
    }

    let key = decode_object_key(raw_key);
    if !key.to_lowercase().ends_with(GEOJSON_EXTENSION) {
        return Route::Skip(SkipReason::NotGeoJson(key));
    }

    Route::Ingest(ObjectTarget {
        bucket: bucket.to_string(),
        key,
    })
}

/// Decode an S3 notification key: `+` is a space, `%XX` a byte.
/// Invalid UTF-8 after decoding is replaced rather than rejected.
pub fn decode_object_key(raw: &str) -> String {
    let plus_decoded = raw.replace('+', " ");
    let bytes = urlencoding::decode_binary(plus_decoded.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{BucketEntity, ObjectEntity, S3Entity};

    fn record(event: &str, bucket: Option<&str>, key: Option<&str>) -> NotificationRecord {
        NotificationRecord {
            event_name: Some(event.to_string()),
            s3: Some(S3Entity {
                bucket: Some(BucketEntity {
                    name: bucket.map(str::to_string),
                }),
                object: Some(ObjectEntity {
                    key: key.map(str::to_string),
                }),
            }),
        }
    }

    #[test]
    fn test_mixed_case_extension_is_ingested() {
        let r = route(&record("ObjectCreated:Put", Some("geo"), Some("folder/data.GeoJSON")));
        assert_eq!(
            r.target(),
            Some(&ObjectTarget {
                bucket: "geo".into(),
                key: "folder/data.GeoJSON".into(),
            })
        );
    }

    #[test]
    fn test_any_creation_event_is_accepted() {
        for event in ["ObjectCreated:Post", "ObjectCreated:CompleteMultipartUpload"] {
            assert!(route(&record(event, Some("geo"), Some("a.geojson"))).target().is_some());
        }
    }

    #[test]
    fn test_removal_event_is_skipped() {
        let r = route(&record("ObjectRemoved:Delete", Some("geo"), Some("a.geojson")));
        assert_eq!(
            r,
            Route::Skip(SkipReason::UnsupportedEvent("ObjectRemoved:Delete".into()))
        );
    }

    #[test]
    fn test_non_geojson_is_skipped() {
        let r = route(&record("ObjectCreated:Put", Some("geo"), Some("notes.txt")));
        assert_eq!(r, Route::Skip(SkipReason::NotGeoJson("notes.txt".into())));
    }

    #[test]
    fn test_missing_bucket_or_key_is_skipped() {
        let cases = [
            record("ObjectCreated:Put", None, Some("a.geojson")),
            record("ObjectCreated:Put", Some("geo"), None),
            record("ObjectCreated:Put", Some(""), Some("a.geojson")),
            NotificationRecord {
                event_name: Some("ObjectCreated:Put".into()),
                s3: None,
            },
        ];
        for rec in &cases {
            assert_eq!(route(rec), Route::Skip(SkipReason::MissingLocation));
        }
    }

    #[test]
    fn test_key_is_url_decoded() {
        let r = route(&record(
            "ObjectCreated:Put",
            Some("geo"),
            Some("city+parks/caf%C3%A9%20map.geojson"),
        ));
        assert_eq!(r.target().unwrap().key, "city parks/café map.geojson");
    }

    #[test]
    fn test_encoded_extension_is_recognized() {
        // `.geojson` spelled with a percent-encoded dot.
        let r = route(&record("ObjectCreated:Put", Some("geo"), Some("a%2Egeojson")));
        assert_eq!(r.target().unwrap().key, "a.geojson");
    }

    #[test]
    fn test_decode_invalid_utf8_is_lossy() {
        assert_eq!(decode_object_key("bad%FF.geojson"), "bad\u{FFFD}.geojson");
    }

    #[test]
    fn test_target_display() {
        let t = ObjectTarget {
            bucket: "geo".into(),
            key: "a/b.geojson".into(),
        };
        assert_eq!(t.to_string(), "s3://geo/a/b.geojson");
    }
}
