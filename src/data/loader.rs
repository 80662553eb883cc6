//! CSV ingestion for rep metric tables
//!
//! Each task reads a two-column table: one scalar feature column and one
//! label column, both located by header name.

use std::path::Path;

use crate::{RepError, RepRecord, Result};

/// Load all records from a CSV file, keeping file order.
///
/// The file must exist (checked before any parsing) and carry a header row
/// naming both columns.
pub fn load_records(
    path: &Path,
    feature_column: &str,
    label_column: &str,
) -> Result<Vec<RepRecord>> {
    if !path.is_file() {
        return Err(RepError::DatasetNotFound(path.display().to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let value_idx = column_index(&headers, feature_column, path)?;
    let label_idx = column_index(&headers, label_column, path)?;

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        // Rows are 1-based in the file and the header occupies the first line
        let line = row + 2;

        let raw = record.get(value_idx).unwrap_or("");
        let value: f32 = raw.trim().parse().map_err(|_| RepError::InvalidFeature {
            row: line,
            value: raw.to_string(),
        })?;

        let label = record.get(label_idx).unwrap_or("").to_string();
        records.push(RepRecord { value, label });
    }

    log::info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| RepError::MissingColumn {
            column: name.to_string(),
            path: path.display().to_string(),
        })
}
