//! Conversion between the stored annotation blob and [`AnnotationSet`].
//!
//! The record store keeps a photo's annotations as JSON text. Older rows and
//! other producers may hand back the array itself, the array serialized into
//! a string, or nothing at all; every form loads into the same set.

use serde_json::{Map, Value};

use crate::annotation::{Annotation, AnnotationId, PALETTE};
use crate::error::BlobError;
use crate::model::AnnotationSet;

/// Loads whatever the store returned for a photo's annotations field.
///
/// Never fails: an unreadable blob yields an empty set and malformed entries
/// are dropped, each with a `warn` log.
pub fn parse_annotations(field: Option<&Value>) -> AnnotationSet {
    let result = match field {
        None | Some(Value::Null) => return AnnotationSet::new(),
        Some(Value::String(text)) if text.trim().is_empty() => return AnnotationSet::new(),
        Some(Value::String(text)) => decode_blob(text),
        Some(value) => decode_value(value.clone()),
    };
    match result {
        Ok(set) => set,
        Err(err) => {
            tracing::warn!(error = %err, "discarding unreadable annotation blob");
            AnnotationSet::new()
        }
    }
}

/// Decodes the text form of the blob.
pub fn decode_blob(text: &str) -> Result<AnnotationSet, BlobError> {
    let value: Value = serde_json::from_str(text)?;
    decode_value(value)
}

fn decode_value(value: Value) -> Result<AnnotationSet, BlobError> {
    let entries = match value {
        Value::Array(entries) => entries,
        other => return Err(BlobError::NotAnArray(json_kind(&other))),
    };

    let mut annotations = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match decode_entry(entry) {
            Ok(annotation) => annotations.push(annotation),
            Err(reason) => tracing::warn!(index, %reason, "skipping malformed annotation"),
        }
    }
    Ok(AnnotationSet::from(annotations))
}

fn decode_entry(entry: Value) -> Result<Annotation, String> {
    let Value::Object(mut fields) = entry else {
        return Err(format!("expected object, found {}", json_kind(&entry)));
    };
    if !fields.contains_key("type") {
        let inferred = infer_kind(&fields).ok_or("no type and no recognizable geometry")?;
        fields.insert("type".into(), Value::from(inferred));
    }
    if !fields.contains_key("id") {
        let id = AnnotationId::generate();
        tracing::debug!(%id, "assigned id to annotation without one");
        fields.insert("id".into(), Value::from(id.as_str()));
    }
    if !fields.contains_key("color") {
        fields.insert("color".into(), Value::from(PALETTE[0]));
    }
    serde_json::from_value(Value::Object(fields)).map_err(|err| err.to_string())
}

fn infer_kind(fields: &Map<String, Value>) -> Option<&'static str> {
    if fields.contains_key("start") && fields.contains_key("end") {
        Some("dimension")
    } else if fields.contains_key("position") {
        Some("text")
    } else if fields.contains_key("points") {
        Some("freehand")
    } else {
        None
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Serializes the set into the text form the store keeps.
pub fn encode(set: &AnnotationSet) -> serde_json::Result<String> {
    serde_json::to_string(set)
}
