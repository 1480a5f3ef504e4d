//! Error handling for the report service
//!
//! Collaborator-level failures only: configuration, file I/O, table
//! loading, report writing and transport connects. Per-identifier and
//! per-field failures never surface here; the poller captures those as
//! result rows.

use thiserror::Error;
use trackscan_core::CoreError;

/// Report service error type
#[derive(Error, Debug)]
pub enum ReportSrvError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Input/Output operation errors
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV table loading errors
    #[error("Table error: {0}")]
    TableError(String),

    /// Transport connect errors (per-read failures become result rows)
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Report rendering errors
    #[error("Report error: {0}")]
    ReportError(String),

    /// Core engine errors surfaced at the service boundary
    #[error("Core error: {0}")]
    CoreError(String),
}

impl ReportSrvError {
    pub fn config(msg: impl Into<String>) -> Self {
        ReportSrvError::ConfigError(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        ReportSrvError::ConnectionError(msg.into())
    }

    pub fn report(msg: impl Into<String>) -> Self {
        ReportSrvError::ReportError(msg.into())
    }
}

impl From<std::io::Error> for ReportSrvError {
    fn from(err: std::io::Error) -> Self {
        ReportSrvError::IoError(err.to_string())
    }
}

impl From<csv::Error> for ReportSrvError {
    fn from(err: csv::Error) -> Self {
        ReportSrvError::TableError(err.to_string())
    }
}

impl From<figment::Error> for ReportSrvError {
    fn from(err: figment::Error) -> Self {
        ReportSrvError::ConfigError(err.to_string())
    }
}

impl From<CoreError> for ReportSrvError {
    fn from(err: CoreError) -> Self {
        ReportSrvError::CoreError(err.to_string())
    }
}

/// Result type alias for the report service
pub type Result<T> = std::result::Result<T, ReportSrvError>;
