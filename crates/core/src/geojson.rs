//! Structural validation of GeoJSON feature documents.
//!
//! Accepts a bare `Feature` or a `FeatureCollection` and flattens either into
//! an ordered list of [`FeatureRecord`]s. Geometry contents are not inspected
//! here; PostGIS interprets them at insert time.

use serde_json::{Map, Value};

use crate::error::DocumentError;

pub const FEATURE_COLLECTION: &str = "FeatureCollection";
pub const FEATURE: &str = "Feature";

/// One feature of a document, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    /// Raw GeoJSON geometry object.
    pub geometry: Value,
    /// Feature properties; absent or `null` becomes an empty map.
    pub properties: Map<String, Value>,
}

/// Parse document text into its features.
///
/// Rejects the whole document on the first structural problem, so callers
/// never see a partial feature list.
pub fn parse_feature_document(text: &str) -> Result<Vec<FeatureRecord>, DocumentError> {
    let doc: Value = serde_json::from_str(text)?;
    let Value::Object(mut obj) = doc else {
        return Err(DocumentError::InvalidStructure(
            "document root must be a JSON object".into(),
        ));
    };

    let doc_type = obj.get("type").map(|t| match t {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });

    match doc_type.as_deref() {
        Some(FEATURE_COLLECTION) => match obj.remove("features") {
            Some(Value::Array(features)) => features
                .into_iter()
                .enumerate()
                .map(|(index, feature)| feature_record(index, feature))
                .collect(),
            _ => Err(DocumentError::InvalidStructure(
                "FeatureCollection.features must be a list".into(),
            )),
        },
        Some(FEATURE) => Ok(vec![feature_record(0, Value::Object(obj))?]),
        _ => Err(DocumentError::UnsupportedDocumentType(doc_type)),
    }
}

fn feature_record(index: usize, feature: Value) -> Result<FeatureRecord, DocumentError> {
    let Value::Object(mut feature) = feature else {
        return Err(DocumentError::InvalidStructure(format!(
            "feature #{index} is not an object"
        )));
    };

    let geometry = match feature.remove("geometry") {
        None | Some(Value::Null) => return Err(DocumentError::MissingGeometry { index }),
        Some(geometry) => geometry,
    };

    let properties = match feature.remove("properties") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(props)) => props,
        Some(_) => return Err(DocumentError::InvalidProperties { index }),
    };

    Ok(FeatureRecord {
        geometry,
        properties,
    })
}
