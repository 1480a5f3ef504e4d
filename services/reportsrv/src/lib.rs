//! TrackScan report service
//!
//! Polls Modbus TCP registers across tracker-site device categories and
//! renders CSV/HTML reports, toggling the remote report mode over GraphQL
//! before each run.
//!
//! # Architecture
//!
//! - **`config`**: YAML + environment configuration
//! - **`csv_loader`**: field-spec tables and identifier lists
//! - **`transport`**: tokio-modbus TCP adapter behind the core's
//!   `RegisterSource` capability
//! - **`mode_toggle`**: GraphQL mode negotiation (selection fallback,
//!   payload shrinking)
//! - **`report`**: CSV/HTML rendering and the navigation index
//! - **`runner`**: per-site, per-category orchestration
//!
//! The addressing and decoding engine lives in `trackscan-core`; this crate
//! supplies its collaborators.

pub mod config;
pub mod csv_loader;
pub mod error;
pub mod mode_toggle;
pub mod report;
pub mod runner;
pub mod transport;

pub use config::Config;
pub use error::{ReportSrvError, Result};
pub use mode_toggle::{ReportMode, ToggleOutcome};
pub use runner::{run, RunSummary};
