//! Report rendering
//!
//! One CSV and one HTML page per (site, category) plus a navigation index.
//! Rows render in poller order; the grouping by identifier in the pages
//! falls out of that order.

use crate::error::{ReportSrvError, Result};
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use trackscan_core::{DeviceCategory, ResultRow, RowOutcome};

/// Files written for one (site, category)
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub csv: PathBuf,
    pub html: PathBuf,
}

/// Index entry for one generated page
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub site: String,
    pub category: DeviceCategory,
    pub html_file: String,
    pub csv_file: String,
    pub row_count: usize,
    pub error_count: usize,
}

const CSV_HEADER: [&str; 8] = [
    "identifier",
    "site",
    "unit_id",
    "field",
    "start_address",
    "register_count",
    "raw",
    "value",
];

/// Columns shared by the CSV and HTML renderings
///
/// Read failures put the error tag in the raw column and leave the value
/// empty; decode diagnostics keep the raw hex and put the diagnostic in the
/// value column.
fn row_cells(row: &ResultRow) -> [String; 8] {
    let (raw, value) = match &row.outcome {
        RowOutcome::Decoded { raw_hex, value } => (raw_hex.clone(), value.clone()),
        RowOutcome::DecodeFailed { raw_hex, diagnostic } => (raw_hex.clone(), diagnostic.clone()),
        RowOutcome::ReadFailed { error } => (error.clone(), String::new()),
    };
    [
        row.identifier.clone(),
        row.site.clone(),
        row.unit_id.map(|u| u.to_string()).unwrap_or_default(),
        row.field_id.clone(),
        row.start_address.map(|a| a.to_string()).unwrap_or_default(),
        row.register_count.map(|c| c.to_string()).unwrap_or_default(),
        raw,
        value,
    ]
}

fn file_stem(site: &str, category: DeviceCategory) -> String {
    let site: String = site
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("{}_{}", site, category)
}

/// Write the CSV and HTML report for one polled category
pub fn write_category_reports(
    output_dir: &Path,
    site: &str,
    category: DeviceCategory,
    rows: &[ResultRow],
    generated_at: DateTime<Local>,
) -> Result<ReportPaths> {
    fs::create_dir_all(output_dir)?;
    let stem = file_stem(site, category);
    let paths = ReportPaths {
        csv: output_dir.join(format!("{}.csv", stem)),
        html: output_dir.join(format!("{}.html", stem)),
    };

    let mut writer = csv::Writer::from_path(&paths.csv)?;
    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.write_record(row_cells(row))?;
    }
    writer
        .flush()
        .map_err(|e| ReportSrvError::report(format!("flushing {}: {}", paths.csv.display(), e)))?;

    fs::write(&paths.html, render_html_page(site, category, rows, generated_at))?;
    info!(site, category = %category, rows = rows.len(), "wrote {}", paths.csv.display());
    Ok(paths)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const PAGE_STYLE: &str = "\
body { font-family: sans-serif; margin: 2em; } \
table { border-collapse: collapse; } \
th, td { border: 1px solid #ccc; padding: 4px 8px; font-size: 13px; } \
th { background: #eee; } \
tr.read-error td { background: #fdd; } \
tr.decode-diagnostic td { background: #ffd; }";

fn render_html_page(
    site: &str,
    category: DeviceCategory,
    rows: &[ResultRow],
    generated_at: DateTime<Local>,
) -> String {
    let mut page = String::new();
    let _ = write!(
        page,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{site} - {category}</title>\n<style>{PAGE_STYLE}</style>\n</head>\n<body>\n\
         <h1>{site} - {category}</h1>\n<p>Generated {}</p>\n<table>\n<tr>",
        generated_at.format("%Y-%m-%d %H:%M:%S"),
        site = escape_html(site),
        category = category,
    );
    for column in CSV_HEADER {
        let _ = write!(page, "<th>{}</th>", column);
    }
    page.push_str("</tr>\n");
    for row in rows {
        let class = match row.outcome {
            RowOutcome::Decoded { .. } => "",
            RowOutcome::DecodeFailed { .. } => " class=\"decode-diagnostic\"",
            RowOutcome::ReadFailed { .. } => " class=\"read-error\"",
        };
        let _ = write!(page, "<tr{}>", class);
        for cell in row_cells(row) {
            let _ = write!(page, "<td>{}</td>", escape_html(&cell));
        }
        page.push_str("</tr>\n");
    }
    page.push_str("</table>\n</body>\n</html>\n");
    page
}

/// Write the navigation index linking every generated page, grouped by site
pub fn write_index(
    output_dir: &Path,
    entries: &[IndexEntry],
    generated_at: DateTime<Local>,
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join("index.html");

    let mut page = String::new();
    let _ = write!(
        page,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>TrackScan reports</title>\n<style>{PAGE_STYLE}</style>\n</head>\n<body>\n\
         <h1>TrackScan reports</h1>\n<p>Generated {}</p>\n",
        generated_at.format("%Y-%m-%d %H:%M:%S"),
    );
    let mut current_site: Option<&str> = None;
    for entry in entries {
        if current_site != Some(entry.site.as_str()) {
            if current_site.is_some() {
                page.push_str("</ul>\n");
            }
            let _ = write!(page, "<h2>{}</h2>\n<ul>\n", escape_html(&entry.site));
            current_site = Some(entry.site.as_str());
        }
        let _ = write!(
            page,
            "<li><a href=\"{html}\">{category}</a> ({rows} rows, {errors} errors) \
             [<a href=\"{csv}\">csv</a>]</li>\n",
            html = entry.html_file,
            csv = entry.csv_file,
            category = entry.category,
            rows = entry.row_count,
            errors = entry.error_count,
        );
    }
    if current_site.is_some() {
        page.push_str("</ul>\n");
    }
    page.push_str("</body>\n</html>\n");

    fs::write(&path, page)?;
    info!(entries = entries.len(), "wrote {}", path.display());
    Ok(path)
}
