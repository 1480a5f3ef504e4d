//! Error handling for the TrackScan core engine
//!
//! Two families live here: `CoreError` for failures that stop work on one
//! identifier or field (the poller captures them as error rows), and
//! `DecodeError` for diagnostics produced while decoding register words
//! (attached to a row next to the raw hex, never aborting a run).

use thiserror::Error;

/// Core engine error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Identifier is not usable for the requested category/mode
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Category name not recognized when parsing configuration or CLI input
    #[error("Unknown device category: {0}")]
    UnknownDeviceCategory(String),

    /// Field spec rejected before any network access
    #[error("Invalid field spec: {0}")]
    InvalidFieldSpec(String),

    /// Register transport failure (connect, read, timeout)
    #[error("Transport error: {0}")]
    Transport(String),
}

impl CoreError {
    pub fn invalid_identifier(msg: impl Into<String>) -> Self {
        CoreError::InvalidIdentifier(msg.into())
    }

    pub fn invalid_field_spec(msg: impl Into<String>) -> Self {
        CoreError::InvalidFieldSpec(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        CoreError::Transport(msg.into())
    }
}

/// Result type alias for the core engine
pub type Result<T> = std::result::Result<T, CoreError>;

/// Diagnostic produced while decoding a register range
///
/// Rendered into the value column of a report row; a diagnostic never
/// discards the raw hex that produced it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Response carried fewer bytes than the codec needs
    #[error("not enough bytes for {codec}: need {needed}, got {got}")]
    NotEnoughBytes {
        codec: &'static str,
        needed: usize,
        got: usize,
    },

    /// Codec is recognized but its decoding is intentionally not implemented
    #[error("{0} decoding is not implemented")]
    Unimplemented(&'static str),

    /// Codec name did not resolve to any canonical codec
    #[error("unknown codec '{0}'")]
    UnknownCodec(String),

    /// Combined hex string is malformed (odd length or non-hex digits)
    #[error("invalid hex data: {0}")]
    BadHex(String),
}
