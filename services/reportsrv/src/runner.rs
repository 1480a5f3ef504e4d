//! Run orchestration
//!
//! One run: load tables, apply the remote report mode (never gating), then
//! poll each configured site x category sequentially over its own
//! connection and render the reports plus the navigation index. A category
//! whose connection cannot be established is skipped with a warning; the
//! run itself only fails for collaborator-level problems (tables, output).

use crate::config::Config;
use crate::csv_loader;
use crate::error::{ReportSrvError, Result};
use crate::mode_toggle::{self, ToggleOutcome};
use crate::report::{self, IndexEntry};
use crate::transport::ModbusTcpSource;
use chrono::Local;
use std::time::Duration;
use tracing::{error, info, warn};
use trackscan_core::{poll_category, FieldSpec, FieldTable, ResultRow, RowOutcome};

/// What a run produced, for the end-of-run summary
#[derive(Debug, Default)]
pub struct RunSummary {
    pub pages: usize,
    pub rows: usize,
    pub error_rows: usize,
    pub skipped_categories: usize,
    pub toggle: Option<ToggleOutcome>,
}

fn error_rows(rows: &[ResultRow]) -> usize {
    rows.iter()
        .filter(|row| !matches!(row.outcome, RowOutcome::Decoded { .. }))
        .count()
}

/// Execute one full report run
pub async fn run(config: &Config) -> Result<RunSummary> {
    let identifiers = csv_loader::load_identifiers(&config.tables.identifiers)
        .map_err(|e| ReportSrvError::TableError(format!("{:#}", e)))?;
    let asset_fields = csv_loader::load_field_specs(&config.tables.asset_fields)
        .map_err(|e| ReportSrvError::TableError(format!("{:#}", e)))?;
    let network_fields = csv_loader::load_field_specs(&config.tables.network_fields)
        .map_err(|e| ReportSrvError::TableError(format!("{:#}", e)))?;
    info!(
        identifiers = identifiers.len(),
        asset_fields = asset_fields.len(),
        network_fields = network_fields.len(),
        mode = %config.mode,
        "tables loaded"
    );

    let mut summary = RunSummary {
        toggle: mode_toggle::toggle_if_enabled(&config.mode_toggle, config.mode).await,
        ..RunSummary::default()
    };

    let addressing = config.mode.addressing();
    let connect_timeout = Duration::from_millis(config.modbus.connect_timeout_ms);
    let read_timeout = Duration::from_millis(config.modbus.read_timeout_ms);
    let generated_at = Local::now();
    let mut index = Vec::new();

    for site in &config.sites {
        for category in config.run_categories() {
            let fields: &[FieldSpec] = match category.field_table() {
                FieldTable::Asset => &asset_fields,
                FieldTable::Network => &network_fields,
            };

            // One connection per (site, category); a failed connect skips
            // the category, not the run.
            let mut source = match ModbusTcpSource::connect(
                &site.host,
                site.port,
                connect_timeout,
                read_timeout,
            )
            .await
            {
                Ok(source) => source,
                Err(err) => {
                    error!(site = site.name.as_str(), category = %category, "{}", err);
                    summary.skipped_categories += 1;
                    continue;
                }
            };

            let rows = poll_category(
                &site.name,
                category,
                addressing,
                &identifiers,
                fields,
                &mut source,
            )
            .await;
            source.disconnect().await;

            let errors = error_rows(&rows);
            if errors > 0 {
                warn!(site = site.name.as_str(), category = %category, errors, "run had error rows");
            }
            let paths = report::write_category_reports(
                &config.output_dir,
                &site.name,
                category,
                &rows,
                generated_at,
            )?;
            index.push(IndexEntry {
                site: site.name.clone(),
                category,
                html_file: file_name(&paths.html),
                csv_file: file_name(&paths.csv),
                row_count: rows.len(),
                error_count: errors,
            });
            summary.pages += 1;
            summary.rows += rows.len();
            summary.error_rows += errors;
        }
    }

    report::write_index(&config.output_dir, &index, generated_at)?;
    Ok(summary)
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
