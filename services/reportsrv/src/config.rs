//! Report service configuration
//!
//! YAML file merged with `TRACKSCAN_`-prefixed environment variables via
//! figment. Sites, category selection, table paths and the mode-toggle
//! endpoint all live here; nothing reads ambient state after load.

use crate::error::{ReportSrvError, Result};
use crate::mode_toggle::ReportMode;
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use trackscan_core::DeviceCategory;

pub const DEFAULT_MODBUS_PORT: u16 = 502;

/// One site to poll, identified by host address
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    pub name: String,
    pub host: String,
    #[serde(default = "default_modbus_port")]
    pub port: u16,
}

fn default_modbus_port() -> u16 {
    DEFAULT_MODBUS_PORT
}

/// Input table locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TableFiles {
    /// Identifier list (TTIDs or positions), first column
    pub identifiers: PathBuf,
    /// Field specs for row boxes, weather stations and repeaters
    pub asset_fields: PathBuf,
    /// Field specs for network controllers
    pub network_fields: PathBuf,
}

/// Modbus transport tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModbusConfig {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_read_timeout_ms() -> u64 {
    2_000
}

/// Remote mode-toggle endpoint
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToggleConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
    /// Bearer token passed through as-is
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_toggle_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_toggle_timeout_ms() -> u64 {
    5_000
}

/// Top-level service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub sites: Vec<SiteConfig>,
    /// Categories to poll per site; empty means all four
    #[serde(default)]
    pub categories: Vec<DeviceCategory>,
    #[serde(default = "ReportMode::default")]
    pub mode: ReportMode,
    pub tables: TableFiles,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub modbus: ModbusConfig,
    #[serde(default)]
    pub mode_toggle: ToggleConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl Config {
    /// Load from a YAML file with `TRACKSCAN_` environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReportSrvError::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let config: Config = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("TRACKSCAN_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            return Err(ReportSrvError::config("no sites configured"));
        }
        for site in &self.sites {
            if site.host.trim().is_empty() {
                return Err(ReportSrvError::config(format!(
                    "site '{}' has no host",
                    site.name
                )));
            }
        }
        if self.mode_toggle.enabled && self.mode_toggle.url.trim().is_empty() {
            return Err(ReportSrvError::config("mode_toggle.enabled with no url"));
        }
        Ok(())
    }

    /// Categories for this run, in fixed category order
    pub fn run_categories(&self) -> Vec<DeviceCategory> {
        if self.categories.is_empty() {
            DeviceCategory::ALL.to_vec()
        } else {
            self.categories.clone()
        }
    }
}
