//! CSV table loading
//!
//! Field-spec tables and identifier lists are maintained by hand in the
//! field, so loading is lenient where the poller can report the problem
//! per row: numeric cells that fail to parse load as `None` and surface as
//! invalid-field-spec result rows instead of being dropped here. Only a
//! missing or unreadable file aborts a run.

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};
use trackscan_core::FieldSpec;

/// Raw field-spec row as it appears in the table
#[derive(Debug, Deserialize)]
struct RawFieldRecord {
    field: String,
    base_register: String,
    register_count: String,
    codec: String,
}

/// Load a field-spec table, preserving declaration order
pub fn load_field_specs(path: &Path) -> Result<Vec<FieldSpec>> {
    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening field table {}", path.display()))?;

    let mut specs = Vec::new();
    for (index, record) in reader.deserialize::<RawFieldRecord>().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(
                    "{}: skipping malformed line {}: {}",
                    path.display(),
                    index + 2,
                    err
                );
                continue;
            }
        };
        if record.field.is_empty() {
            warn!("{}: skipping unnamed field on line {}", path.display(), index + 2);
            continue;
        }
        specs.push(FieldSpec {
            id: record.field,
            base_register: parse_cell(&record.base_register),
            register_count: parse_cell(&record.register_count),
            codec: record.codec,
        });
    }
    debug!("{}: loaded {} field specs", path.display(), specs.len());
    Ok(specs)
}

/// Lenient numeric cell parse; `None` marks the spec invalid downstream
fn parse_cell(cell: &str) -> Option<i64> {
    cell.trim().parse::<i64>().ok()
}

/// Load an identifier list: first column, order and duplicates preserved
///
/// A leading `ttid` / `position` / `identifier` header row is tolerated.
pub fn load_identifiers(path: &Path) -> Result<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening identifier list {}", path.display()))?;

    let mut identifiers = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("reading {} line {}", path.display(), index + 1))?;
        let token = record.get(0).unwrap_or_default().trim();
        if token.is_empty() {
            continue;
        }
        if index == 0 && matches!(token.to_lowercase().as_str(), "ttid" | "position" | "identifier")
        {
            continue;
        }
        identifiers.push(token.to_string());
    }
    debug!("{}: loaded {} identifiers", path.display(), identifiers.len());
    Ok(identifiers)
}
