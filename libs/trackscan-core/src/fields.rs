//! Field specifications
//!
//! A field spec names one register range to read for a device: a label, a
//! base register offset within the device's block, a register count and a
//! codec name. Specs load from CSV tables; numeric cells that fail to parse
//! are kept as `None` so the poller reports them as invalid rows instead of
//! the loader silently dropping them.

use crate::address::DeviceCategory;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Which field-spec table a category reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTable {
    /// Row boxes, weather stations and repeaters share one table
    Asset,
    /// Network controllers have their own table
    Network,
}

impl DeviceCategory {
    pub fn field_table(self) -> FieldTable {
        match self {
            DeviceCategory::Network => FieldTable::Network,
            _ => FieldTable::Asset,
        }
    }
}

/// One register range to read for a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Human-readable quantity name
    pub id: String,
    /// Offset within the device's register block
    pub base_register: Option<i64>,
    /// Number of consecutive 16-bit registers to read
    pub register_count: Option<i64>,
    /// Raw codec name, possibly aliased
    pub codec: String,
}

impl FieldSpec {
    pub fn new(
        id: impl Into<String>,
        base_register: i64,
        register_count: i64,
        codec: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            base_register: Some(base_register),
            register_count: Some(register_count),
            codec: codec.into(),
        }
    }

    /// Check the spec before any network access
    ///
    /// Returns the base register and count ready for address computation.
    pub fn validate(&self) -> Result<(i64, u16), CoreError> {
        let base = self.base_register.ok_or_else(|| {
            CoreError::InvalidFieldSpec(format!("{}: base register is not a number", self.id))
        })?;
        if base < 0 {
            return Err(CoreError::InvalidFieldSpec(format!(
                "{}: base register {} is negative",
                self.id, base
            )));
        }
        let count = self.register_count.ok_or_else(|| {
            CoreError::InvalidFieldSpec(format!("{}: register count is not a number", self.id))
        })?;
        if count <= 0 {
            return Err(CoreError::InvalidFieldSpec(format!(
                "{}: register count must be positive, got {}",
                self.id, count
            )));
        }
        let count = u16::try_from(count).map_err(|_| {
            CoreError::InvalidFieldSpec(format!(
                "{}: register count {} exceeds a single read",
                self.id, count
            ))
        })?;
        Ok((base, count))
    }
}
