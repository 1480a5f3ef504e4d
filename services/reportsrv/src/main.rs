//! TrackScan report service entry point

use anyhow::bail;
use clap::Parser;
use colored::Colorize;
use reportsrv::mode_toggle::ToggleOutcome;
use reportsrv::{runner, Config, ReportMode, RunSummary};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Tracker-site register report generator")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config/reportsrv.yaml")]
    config: PathBuf,

    /// Override the output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Override the report mode (ttid, legacy-sorted, legacy-unsorted)
    #[arg(short, long, value_parser = parse_mode)]
    mode: Option<ReportMode>,

    /// Only poll the named site
    #[arg(long)]
    site: Option<String>,
}

fn parse_mode(value: &str) -> Result<ReportMode, String> {
    value.parse::<ReportMode>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging();

    let mut config = Config::load(&args.config)?;
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(site) = &args.site {
        config.sites.retain(|s| &s.name == site);
        if config.sites.is_empty() {
            bail!("site '{}' is not configured", site);
        }
    }

    info!(
        sites = config.sites.len(),
        mode = %config.mode,
        output = %config.output_dir.display(),
        "starting report run"
    );
    let summary = runner::run(&config).await?;
    print_summary(&summary);
    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", "Report run complete".bold());
    println!("  pages written:      {}", summary.pages.to_string().green());
    println!("  rows:               {}", summary.rows);
    if summary.error_rows > 0 {
        println!(
            "  error rows:         {}",
            summary.error_rows.to_string().red()
        );
    }
    if summary.skipped_categories > 0 {
        println!(
            "  skipped categories: {}",
            summary.skipped_categories.to_string().yellow()
        );
    }
    match &summary.toggle {
        Some(ToggleOutcome::Applied { flags }) => {
            println!("  mode toggle:        {} ({})", "applied".green(), flags.join(", "));
        }
        Some(ToggleOutcome::SkippedUnsupported) => {
            println!("  mode toggle:        {}", "skipped (unsupported)".yellow());
        }
        Some(ToggleOutcome::SkippedExhausted) => {
            println!("  mode toggle:        {}", "skipped (retries exhausted)".yellow());
        }
        None => {}
    }
}
