//! Register polling
//!
//! Walks identifier x field-spec grids for one device category, computing
//! addresses, reading registers through an injected [`RegisterSource`] and
//! decoding the returned words. Every per-identifier or per-field failure
//! becomes an error row; nothing here aborts a run.

use crate::address::{start_address, unit_id, AddressingMode, DeviceCategory};
use crate::codec::{self, CodecName};
use crate::error::{CoreError, DecodeError};
use crate::fields::FieldSpec;
use async_trait::async_trait;
use tracing::{debug, trace, warn};

/// Capability to read holding registers
///
/// Words are 16-bit values but may arrive in a signed representation from
/// the transport; the poller normalizes before rendering hex. Takes `&mut
/// self` since selecting a unit is a connection-wide mutation that must
/// happen immediately before the matching read.
#[async_trait]
pub trait RegisterSource {
    async fn read_registers(
        &mut self,
        unit_id: u16,
        address: u32,
        count: u16,
    ) -> Result<Vec<i32>, CoreError>;
}

/// Outcome of one decode attempt
///
/// A row never mixes a successful decode with an error tag: read failures
/// carry the tag where the raw hex would go, decode diagnostics keep the
/// raw hex and put the diagnostic where the value would go.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Decoded { raw_hex: String, value: String },
    DecodeFailed { raw_hex: String, diagnostic: String },
    ReadFailed { error: String },
}

impl RowOutcome {
    pub fn is_read_failure(&self) -> bool {
        matches!(self, RowOutcome::ReadFailed { .. })
    }
}

/// One decode attempt, success or error, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    /// Identifier token exactly as supplied
    pub identifier: String,
    pub site: String,
    pub unit_id: Option<u16>,
    pub field_id: String,
    pub start_address: Option<u32>,
    pub register_count: Option<i64>,
    pub outcome: RowOutcome,
}

impl ResultRow {
    fn failed(site: &str, identifier: &str, error: &CoreError) -> Self {
        ResultRow {
            identifier: identifier.to_string(),
            site: site.to_string(),
            unit_id: None,
            field_id: String::new(),
            start_address: None,
            register_count: None,
            outcome: RowOutcome::ReadFailed {
                error: error.to_string(),
            },
        }
    }
}

/// Render one register word as 4 lowercase hex digits
///
/// Transports that hand words back signed deliver `-1` for `0xffff`;
/// negative values are re-based by `0x10000` before rendering. Values that
/// somehow exceed 16 bits keep their full width.
pub fn word_hex(word: i32) -> String {
    let normalized = if word < 0 { 0x10000 + word } else { word };
    format!("{:04x}", normalized)
}

/// Concatenate register words into the combined hex string, register order
pub fn combine_words(words: &[i32]) -> String {
    words.iter().map(|w| word_hex(*w)).collect()
}

/// Left-pad hex to the codec width with zeros; never truncate
pub fn pad_hex(hex: &str, width: usize) -> String {
    if hex.len() >= width {
        hex.to_string()
    } else {
        format!("{}{}", "0".repeat(width - hex.len()), hex)
    }
}

/// Poll every identifier x field combination for one category
///
/// Rows come back in input identifier order and, within an identifier, in
/// field-spec declaration order; downstream report grouping relies on this.
pub async fn poll_category<S: RegisterSource + ?Sized>(
    site: &str,
    category: DeviceCategory,
    mode: AddressingMode,
    identifiers: &[String],
    fields: &[FieldSpec],
    source: &mut S,
) -> Vec<ResultRow> {
    let mut rows = Vec::with_capacity(identifiers.len() * fields.len());

    for token in identifiers {
        let identifier = match token.trim().parse::<i64>() {
            Ok(n) => n,
            Err(_) => {
                let err =
                    CoreError::InvalidIdentifier(format!("'{}' is not a number", token.trim()));
                warn!(site, category = %category, token = token.as_str(), "skipping identifier: {}", err);
                rows.push(ResultRow::failed(site, token, &err));
                continue;
            }
        };

        let unit = match unit_id(category, mode, identifier) {
            Ok(unit) => unit,
            Err(err) => {
                warn!(site, category = %category, identifier, "skipping identifier: {}", err);
                rows.push(ResultRow::failed(site, token, &err));
                continue;
            }
        };

        debug!(site, category = %category, identifier, unit, "polling {} fields", fields.len());
        for spec in fields {
            rows.push(poll_field(site, category, mode, token, identifier, unit, spec, source).await);
        }
    }

    rows
}

#[allow(clippy::too_many_arguments)]
async fn poll_field<S: RegisterSource + ?Sized>(
    site: &str,
    category: DeviceCategory,
    mode: AddressingMode,
    token: &str,
    identifier: i64,
    unit: u16,
    spec: &FieldSpec,
    source: &mut S,
) -> ResultRow {
    let mut row = ResultRow {
        identifier: token.to_string(),
        site: site.to_string(),
        unit_id: Some(unit),
        field_id: spec.id.clone(),
        start_address: None,
        register_count: spec.register_count,
        outcome: RowOutcome::ReadFailed {
            error: String::new(),
        },
    };

    // Reject malformed specs before any network access.
    let (base, count) = match spec.validate() {
        Ok(parts) => parts,
        Err(err) => {
            warn!(site, field = spec.id.as_str(), "{}", err);
            row.outcome = RowOutcome::ReadFailed {
                error: err.to_string(),
            };
            return row;
        }
    };

    let address = match start_address(category, mode, identifier, unit, base) {
        Ok(address) => address,
        Err(err) => {
            row.outcome = RowOutcome::ReadFailed {
                error: err.to_string(),
            };
            return row;
        }
    };
    row.start_address = Some(address);

    // One attempt per field; a failed read never blocks the next field.
    let words = match source.read_registers(unit, address, count).await {
        Ok(words) => words,
        Err(err) => {
            warn!(
                site,
                identifier,
                unit,
                address,
                count,
                "read failed: {}",
                err
            );
            row.outcome = RowOutcome::ReadFailed {
                error: err.to_string(),
            };
            return row;
        }
    };

    let combined = combine_words(&words);
    row.outcome = decode_combined(&combined, &spec.codec);
    trace!(
        site,
        identifier,
        field = spec.id.as_str(),
        raw = combined.as_str(),
        "decoded"
    );
    row
}

/// Pad and decode a combined hex string with a raw codec name
fn decode_combined(combined: &str, raw_codec: &str) -> RowOutcome {
    match codec::resolve(raw_codec) {
        CodecName::Canonical(c) => {
            let padded = pad_hex(combined, c.pad_width());
            match codec::decode(&padded, c) {
                Ok(value) => RowOutcome::Decoded {
                    raw_hex: padded,
                    value: value.to_string(),
                },
                Err(diag) => RowOutcome::DecodeFailed {
                    raw_hex: padded,
                    diagnostic: diag.to_string(),
                },
            }
        }
        // A blank codec cell yields an absent value, not a diagnostic.
        CodecName::Unknown(name) if name.trim().is_empty() => RowOutcome::Decoded {
            raw_hex: combined.to_string(),
            value: String::new(),
        },
        CodecName::Unknown(name) => RowOutcome::DecodeFailed {
            raw_hex: combined.to_string(),
            diagnostic: DecodeError::UnknownCodec(name).to_string(),
        },
    }
}
