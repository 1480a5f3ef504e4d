//! TrackScan core engine
//!
//! Register-address computation and value decoding for tracker-site
//! polling. The engine is pure apart from the injected [`RegisterSource`]
//! capability: given a device category, an identifier and a field spec, it
//! computes the unit id and absolute starting register, reads the range
//! through the capability, assembles the combined hex string and decodes it
//! into a typed value.
//!
//! # Architecture
//!
//! - [`codec`] - codec alias resolution and hex decoding
//! - [`address`] - unit id and start address per category/mode
//! - [`fields`] - field-spec records and validation
//! - [`poller`] - identifier x field orchestration producing result rows
//!
//! Transports, spec tables, report rendering and configuration live in the
//! service crate; this crate never touches the network or the filesystem.

pub mod address;
pub mod codec;
pub mod error;
pub mod fields;
pub mod poller;

pub use address::{start_address, unit_id, AddressingMode, DeviceCategory};
pub use codec::{decode, resolve, CodecName, DecodedValue, RegisterCodec};
pub use error::{CoreError, DecodeError, Result};
pub use fields::{FieldSpec, FieldTable};
pub use poller::{poll_category, RegisterSource, ResultRow, RowOutcome};
