use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracker_core::{OperationStatus, RawSnapshot};

use crate::{FailureKind, SourceError};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedBatch {
    pub snapshots: Vec<RawSnapshot>,
    /// Entries dropped because they were not objects or carried no id.
    pub skipped: usize,
}

/// Decodes a list response: either a bare array or `{"operations": [...]}`.
///
/// Entries are decoded one by one; a bad entry is counted and skipped.
pub fn decode_batch(body: &[u8]) -> Result<DecodedBatch, SourceError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| SourceError::new(FailureKind::Decode, err.to_string()))?;

    let entries = match value {
        Value::Array(items) => items,
        Value::Object(mut envelope) => match envelope.remove("operations") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                return Err(SourceError::new(
                    FailureKind::Decode,
                    "`operations` is not an array",
                ))
            }
        },
        _ => {
            return Err(SourceError::new(
                FailureKind::Decode,
                "expected an array or an object with `operations`",
            ))
        }
    };

    let mut batch = DecodedBatch::default();
    for entry in &entries {
        match entry.as_object().and_then(decode_fields) {
            Some(snapshot) => batch.snapshots.push(snapshot),
            None => batch.skipped += 1,
        }
    }
    Ok(batch)
}

/// Decodes a single-operation response.
pub fn decode_snapshot(body: &[u8]) -> Result<RawSnapshot, SourceError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| SourceError::new(FailureKind::Decode, err.to_string()))?;
    let object = match &value {
        Value::Object(map) => match map.get("operation") {
            Some(Value::Object(inner)) => inner,
            _ => map,
        },
        _ => return Err(SourceError::new(FailureKind::Decode, "expected an object")),
    };
    decode_fields(object)
        .ok_or_else(|| SourceError::new(FailureKind::Decode, "operation has no id"))
}

/// Field-wise decoding: a field of the wrong type is treated as missing.
fn decode_fields(map: &Map<String, Value>) -> Option<RawSnapshot> {
    let id = match map.get("id").or_else(|| map.get("progress_id"))? {
        Value::String(id) if !id.trim().is_empty() => id.trim().to_string(),
        Value::Number(id) => id.to_string(),
        _ => return None,
    };

    Some(RawSnapshot {
        id,
        status: string_field(map, "status")
            .map(OperationStatus::from)
            .unwrap_or_default(),
        progress_percentage: float_field(map, "progress_percentage")
            .or_else(|| float_field(map, "progress")),
        pages_processed: count_field(map, "pages_processed"),
        code_examples_found: count_field(map, "code_examples_found"),
        current_depth: count_field(map, "current_depth").and_then(|d| u32::try_from(d).ok()),
        max_depth: count_field(map, "max_depth").and_then(|d| u32::try_from(d).ok()),
        target_url: string_field(map, "target_url")
            .or_else(|| string_field(map, "url"))
            .unwrap_or_default(),
        error_message: string_field(map, "error_message").or_else(|| string_field(map, "error")),
        updated_at: string_field(map, "updated_at").and_then(|raw| parse_timestamp(&raw)),
        operation_type: string_field(map, "operation_type"),
        total_pages: count_field(map, "total_pages"),
        current_url: string_field(map, "current_url"),
        message: string_field(map, "message"),
    })
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(ToOwned::to_owned)
}

fn float_field(map: &Map<String, Value>, key: &str) -> Option<f64> {
    match map.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn count_field(map: &Map<String, Value>, key: &str) -> Option<u64> {
    match map.get(key)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
