//! Output artifacts for a scraping run.
//!
//! Currently a single artifact: the CSV file of kept records, one column
//! per profile field in declared order.

use std::path::Path;

use serde_json::Value;
use tracing::{info, instrument};

use pagesift_shared::{FieldSpec, PageSiftError, Record, Result};

/// Write `records` to `path` as CSV with a header row of field names.
///
/// Keys outside the field list are ignored; missing or null values become
/// empty cells. Nothing is written for an empty record list. Returns the
/// number of data rows written.
#[instrument(skip_all, fields(path = %path.display(), records = records.len()))]
pub fn write_csv(path: &Path, fields: &[FieldSpec], records: &[Record]) -> Result<usize> {
    if records.is_empty() {
        info!("no records to save");
        return Ok(0);
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| PageSiftError::io(dir, e))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| PageSiftError::Export(format!("failed to create {}: {e}", path.display())))?;

    writer
        .write_record(fields.iter().map(|f| f.name.as_str()))
        .map_err(|e| PageSiftError::Export(format!("failed to write CSV header: {e}")))?;

    for record in records {
        let row: Vec<String> = fields
            .iter()
            .map(|f| cell_value(record.get(&f.name)))
            .collect();
        writer
            .write_record(&row)
            .map_err(|e| PageSiftError::Export(format!("failed to write CSV record: {e}")))?;
    }

    writer.flush().map_err(|e| PageSiftError::io(path, e))?;

    info!(rows = records.len(), "saved records to CSV");
    Ok(records.len())
}

/// Render one JSON value as a CSV cell.
fn cell_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| cell_value(Some(v)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}
