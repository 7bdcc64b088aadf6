//! Per-page record filtering: error flags, completeness, dedup by name, and
//! type normalization.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, info};

use pagesift_shared::{FieldKind, FieldSpec, Profile, Record};

/// Whether `name` has already been kept during this run.
pub fn is_duplicate(name: &str, seen_names: &HashSet<String>) -> bool {
    seen_names.contains(name)
}

/// Whether `record` carries every required key with a non-null value.
pub fn is_complete(record: &Record, required_keys: &[String]) -> bool {
    required_keys
        .iter()
        .all(|key| record.get(key).is_some_and(|v| !v.is_null()))
}

/// Dedup identity of a record: its `dedup_key` value as trimmed text.
pub fn record_name(record: &Record, dedup_key: &str) -> Option<String> {
    match record.get(dedup_key)? {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

/// Filter one page's extracted records down to new, complete ones.
///
/// `seen_names` is updated with the names of the kept records.
pub fn process_records(
    records: Vec<Record>,
    profile: &Profile,
    seen_names: &mut HashSet<String>,
) -> Vec<Record> {
    let required_keys = profile.required_keys();
    let mut kept = Vec::new();

    for mut record in records {
        debug!(?record, "processing record");

        match record.get("error") {
            Some(Value::Bool(false)) => {
                record.remove("error");
            }
            Some(Value::Bool(true)) => {
                debug!("skipping extraction error item");
                continue;
            }
            _ => {}
        }

        if !is_complete(&record, &required_keys) {
            continue;
        }

        let Some(name) = record_name(&record, &profile.dedup_key) else {
            debug!(dedup_key = %profile.dedup_key, "record has no dedup value, skipping");
            continue;
        };

        if is_duplicate(&name, seen_names) {
            info!(%name, "duplicate record found, skipping");
            continue;
        }

        seen_names.insert(name);
        kept.push(normalize_record(record, &profile.fields));
    }

    kept
}

// i64::MIN is exactly representable; i64::MAX rounds up to 2^63.
const I64_MIN_F64: f64 = i64::MIN as f64;
const I64_MAX_F64: f64 = i64::MAX as f64;

/// Coerce field values to their declared kinds where that is lossless.
///
/// Integer fields accept numeric strings ("1234") and whole floats; string
/// fields render numbers and booleans as text. Values that cannot be
/// coerced are left untouched.
pub fn normalize_record(mut record: Record, fields: &[FieldSpec]) -> Record {
    for field in fields {
        let Some(value) = record.get_mut(&field.name) else {
            continue;
        };
        let normalized = match (field.kind, &*value) {
            (FieldKind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
            (FieldKind::Integer, Value::Number(n)) if n.as_i64().is_none() => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && (I64_MIN_F64..I64_MAX_F64).contains(f))
                .map(|f| Value::from(f as i64)),
            (FieldKind::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (FieldKind::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
            (FieldKind::String, Value::String(s)) if s.trim().len() != s.len() => {
                Some(Value::String(s.trim().to_string()))
            }
            _ => None,
        };
        if let Some(normalized) = normalized {
            *value = normalized;
        }
    }
    record
}
