//! Register value codecs
//!
//! Maps free-form codec names from the field-spec tables onto a canonical
//! codec and decodes combined register hex into typed values. Decoding is
//! pure: the same hex and codec always produce the same value or the same
//! diagnostic.

use crate::error::DecodeError;
use std::fmt;

/// Canonical register codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterCodec {
    Ascii,
    Float32,
    Int32,
    Uint32,
    Uint64,
    Int64,
    Int16,
    Uint16,
    Boolean,
    Hex,
}

impl RegisterCodec {
    /// Canonical lowercase name, used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            RegisterCodec::Ascii => "ascii",
            RegisterCodec::Float32 => "float32",
            RegisterCodec::Int32 => "int32",
            RegisterCodec::Uint32 => "uint32",
            RegisterCodec::Uint64 => "uint64",
            RegisterCodec::Int64 => "int64",
            RegisterCodec::Int16 => "int16",
            RegisterCodec::Uint16 => "uint16",
            RegisterCodec::Boolean => "boolean",
            RegisterCodec::Hex => "hex",
        }
    }

    /// Required left-padding width in hex digits (0 = no padding)
    pub fn pad_width(self) -> usize {
        match self {
            RegisterCodec::Ascii | RegisterCodec::Hex => 0,
            RegisterCodec::Int16 | RegisterCodec::Uint16 | RegisterCodec::Boolean => 4,
            RegisterCodec::Float32 | RegisterCodec::Int32 | RegisterCodec::Uint32 => 8,
            RegisterCodec::Uint64 | RegisterCodec::Int64 => 16,
        }
    }

    /// Minimum byte length required to decode
    pub fn min_bytes(self) -> usize {
        match self {
            RegisterCodec::Ascii | RegisterCodec::Hex => 0,
            RegisterCodec::Int16 | RegisterCodec::Uint16 | RegisterCodec::Boolean => 2,
            RegisterCodec::Float32 | RegisterCodec::Int32 | RegisterCodec::Uint32 => 4,
            RegisterCodec::Uint64 | RegisterCodec::Int64 => 8,
        }
    }
}

impl fmt::Display for RegisterCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of resolving a raw codec name
///
/// Unknown names pass through unchanged so the caller can report "unknown
/// codec" per field instead of failing a whole table load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecName {
    Canonical(RegisterCodec),
    Unknown(String),
}

/// Resolve a raw codec name from a field-spec table
///
/// Lookup is on the lowercased, trimmed form; unrecognized names are
/// returned as [`CodecName::Unknown`] carrying the original string.
pub fn resolve(name: &str) -> CodecName {
    let canonical = match name.trim().to_lowercase().as_str() {
        "ascii" | "string" | "text" => RegisterCodec::Ascii,
        "float" | "float32" | "f32" => RegisterCodec::Float32,
        "int32" | "i32" => RegisterCodec::Int32,
        "uint32" | "u32" | "dword" => RegisterCodec::Uint32,
        "uint64" | "u64" => RegisterCodec::Uint64,
        "int64" | "i64" => RegisterCodec::Int64,
        "int" | "int16" | "i16" | "short" => RegisterCodec::Int16,
        "uint" | "uint16" | "u16" | "word" => RegisterCodec::Uint16,
        "bool" | "boolean" | "bit" => RegisterCodec::Boolean,
        "hex" | "raw" => RegisterCodec::Hex,
        _ => return CodecName::Unknown(name.to_string()),
    };
    CodecName::Canonical(canonical)
}

/// A decoded register value, ready for report rendering
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Text(String),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Bit(u8),
    Hex(String),
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedValue::Text(s) => f.write_str(s),
            DecodedValue::Integer(v) => write!(f, "{}", v),
            DecodedValue::Unsigned(v) => write!(f, "{}", v),
            DecodedValue::Float(v) => write!(f, "{}", v),
            DecodedValue::Bit(v) => write!(f, "{}", v),
            DecodedValue::Hex(digits) => write!(f, "0x{}", digits),
        }
    }
}

/// Decode a combined hex string with the given codec
///
/// Multi-byte kinds read big-endian from the leading bytes, so a response
/// longer than the codec needs decodes its first registers while the raw
/// string keeps its full width.
pub fn decode(hex: &str, codec: RegisterCodec) -> Result<DecodedValue, DecodeError> {
    let bytes = hex_bytes(hex)?;
    if bytes.len() < codec.min_bytes() {
        return Err(DecodeError::NotEnoughBytes {
            codec: codec.name(),
            needed: codec.min_bytes(),
            got: bytes.len(),
        });
    }

    let value = match codec {
        RegisterCodec::Ascii => {
            let text: String = String::from_utf8_lossy(&bytes)
                .chars()
                .filter(|c| *c != '\0')
                .collect();
            DecodedValue::Text(text)
        }
        RegisterCodec::Float32 => {
            let raw = f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            DecodedValue::Float(f64::from(raw))
        }
        RegisterCodec::Int32 => {
            let raw = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            DecodedValue::Integer(i64::from(raw))
        }
        RegisterCodec::Uint32 => {
            let raw = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            DecodedValue::Unsigned(u64::from(raw))
        }
        RegisterCodec::Uint64 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[..8]);
            DecodedValue::Unsigned(u64::from_be_bytes(buf))
        }
        // Known gap carried over from the field tooling: int64 fields exist
        // in spec tables but have never had a decoder.
        RegisterCodec::Int64 => return Err(DecodeError::Unimplemented("int64")),
        RegisterCodec::Int16 => {
            let raw = i16::from_be_bytes([bytes[0], bytes[1]]);
            DecodedValue::Integer(i64::from(raw))
        }
        RegisterCodec::Uint16 => {
            let raw = u16::from_be_bytes([bytes[0], bytes[1]]);
            DecodedValue::Unsigned(u64::from(raw))
        }
        RegisterCodec::Boolean => {
            let raw = u16::from_be_bytes([bytes[0], bytes[1]]);
            DecodedValue::Bit(u8::from(raw != 0))
        }
        RegisterCodec::Hex => DecodedValue::Hex(hex.to_uppercase()),
    };
    Ok(value)
}

/// Convert a hex string into bytes, rejecting odd lengths and non-hex digits
fn hex_bytes(hex: &str) -> Result<Vec<u8>, DecodeError> {
    if !hex.is_ascii() {
        return Err(DecodeError::BadHex("non-ascii characters".to_string()));
    }
    if hex.len() % 2 != 0 {
        return Err(DecodeError::BadHex(format!(
            "odd number of hex digits ({})",
            hex.len()
        )));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| DecodeError::BadHex(format!("non-hex digits at offset {}", i)))
        })
        .collect()
}
