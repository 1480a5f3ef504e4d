//! Register address computation
//!
//! Each device category maps an identifier onto a Modbus unit id and an
//! absolute starting register, following the two paging conventions used in
//! the field: row boxes are banked (100 identifiers per unit, 512 registers
//! per identifier within the bank) while weather stations, repeaters and
//! network controllers page flat from a fixed unit.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Registers reserved per device slot
pub const REGISTERS_PER_SLOT: i64 = 512;
/// Row-box identifiers per Modbus unit
pub const ROW_BANK_SIZE: i64 = 100;

const WEATHER_UNIT: u16 = 101;
const REPEATER_UNIT: u16 = 102;
const NETWORK_TTID_UNIT: u16 = 100;
const NETWORK_POSITION_UNIT: u16 = 0;

/// Device category polled at a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceCategory {
    /// Tracker / row box
    Row,
    /// Weather station
    Weather,
    /// Signal repeater
    Repeater,
    /// Network controller
    Network,
}

impl DeviceCategory {
    pub const ALL: [DeviceCategory; 4] = [
        DeviceCategory::Row,
        DeviceCategory::Weather,
        DeviceCategory::Repeater,
        DeviceCategory::Network,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceCategory::Row => "row",
            DeviceCategory::Weather => "weather",
            DeviceCategory::Repeater => "repeater",
            DeviceCategory::Network => "network",
        }
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "row" | "rowbox" | "tracker" => Ok(DeviceCategory::Row),
            "weather" | "weatherstation" => Ok(DeviceCategory::Weather),
            "repeater" => Ok(DeviceCategory::Repeater),
            "network" | "ncu" => Ok(DeviceCategory::Network),
            other => Err(CoreError::UnknownDeviceCategory(other.to_string())),
        }
    }
}

/// Which addressing convention the run uses for network controllers
///
/// TTID reports address controllers at unit 100 with 1-based identifiers;
/// the position-based report variants address unit 0 with 0-based slot
/// indexes and no offset. Both conventions exist on real sites and are kept
/// as distinct entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressingMode {
    Ttid,
    Position,
}

/// Resolve the Modbus unit id for an identifier of the given category
pub fn unit_id(
    category: DeviceCategory,
    mode: AddressingMode,
    identifier: i64,
) -> Result<u16, CoreError> {
    match category {
        DeviceCategory::Row => {
            if identifier < 1 {
                return Err(CoreError::InvalidIdentifier(format!(
                    "row identifier must be >= 1, got {}",
                    identifier
                )));
            }
            u16::try_from((identifier - 1) / ROW_BANK_SIZE + 1).map_err(|_| {
                CoreError::InvalidIdentifier(format!(
                    "row identifier {} is out of range",
                    identifier
                ))
            })
        }
        DeviceCategory::Weather => check_one_based(category, identifier, WEATHER_UNIT),
        DeviceCategory::Repeater => check_one_based(category, identifier, REPEATER_UNIT),
        DeviceCategory::Network => match mode {
            AddressingMode::Ttid => check_one_based(category, identifier, NETWORK_TTID_UNIT),
            AddressingMode::Position => {
                if identifier < 0 {
                    return Err(CoreError::InvalidIdentifier(format!(
                        "position must be >= 0, got {}",
                        identifier
                    )));
                }
                Ok(NETWORK_POSITION_UNIT)
            }
        },
    }
}

fn check_one_based(
    category: DeviceCategory,
    identifier: i64,
    unit: u16,
) -> Result<u16, CoreError> {
    if identifier < 1 {
        return Err(CoreError::InvalidIdentifier(format!(
            "{} identifier must be >= 1, got {}",
            category, identifier
        )));
    }
    Ok(unit)
}

/// Compute the absolute starting register for one field read
///
/// `unit` must come from [`unit_id`] for the same identifier; the row-box
/// formula re-bases the address space per 100-identifier bank.
pub fn start_address(
    category: DeviceCategory,
    mode: AddressingMode,
    identifier: i64,
    unit: u16,
    base_register: i64,
) -> Result<u32, CoreError> {
    let slot = match category {
        DeviceCategory::Row => (identifier - 1) - (i64::from(unit) - 1) * ROW_BANK_SIZE,
        DeviceCategory::Weather | DeviceCategory::Repeater => identifier - 1,
        DeviceCategory::Network => match mode {
            AddressingMode::Ttid => identifier - 1,
            // Positions are 0-based: no "-1" offset here.
            AddressingMode::Position => identifier,
        },
    };
    let address = slot * REGISTERS_PER_SLOT + base_register;
    u32::try_from(address).map_err(|_| {
        CoreError::InvalidIdentifier(format!(
            "identifier {} yields out-of-range address {}",
            identifier, address
        ))
    })
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    // ========== Unit id tests ==========

    #[test]
    fn test_row_unit_banks_of_one_hundred() {
        for t in 1..=100_000i64 {
            let unit = unit_id(DeviceCategory::Row, AddressingMode::Ttid, t).unwrap();
            assert_eq!(i64::from(unit), (t - 1) / 100 + 1, "ttid {}", t);
        }
    }

    #[test]
    fn test_row_rejects_non_positive_identifiers() {
        for t in [-5i64, 0] {
            let err = unit_id(DeviceCategory::Row, AddressingMode::Ttid, t).unwrap_err();
            assert!(matches!(err, CoreError::InvalidIdentifier(_)));
        }
    }

    #[test]
    fn test_weather_repeater_units_are_fixed() {
        for t in [1i64, 7, 99, 12_345] {
            assert_eq!(
                unit_id(DeviceCategory::Weather, AddressingMode::Ttid, t).unwrap(),
                101
            );
            assert_eq!(
                unit_id(DeviceCategory::Repeater, AddressingMode::Ttid, t).unwrap(),
                102
            );
        }
    }

    #[test]
    fn test_network_unit_depends_on_mode() {
        assert_eq!(
            unit_id(DeviceCategory::Network, AddressingMode::Ttid, 1).unwrap(),
            100
        );
        assert_eq!(
            unit_id(DeviceCategory::Network, AddressingMode::Position, 0).unwrap(),
            0
        );
    }

    // ========== Start address tests ==========

    #[test]
    fn test_row_address_rebases_per_bank() {
        // ttid 101 is the first identifier of the second bank
        let unit = unit_id(DeviceCategory::Row, AddressingMode::Ttid, 101).unwrap();
        assert_eq!(unit, 2);
        let addr =
            start_address(DeviceCategory::Row, AddressingMode::Ttid, 101, unit, 0).unwrap();
        assert_eq!(addr, 0);

        // within a bank each identifier occupies a 512-register slot
        let unit = unit_id(DeviceCategory::Row, AddressingMode::Ttid, 103).unwrap();
        let addr =
            start_address(DeviceCategory::Row, AddressingMode::Ttid, 103, unit, 7).unwrap();
        assert_eq!(addr, 2 * 512 + 7);
    }

    #[test]
    fn test_row_address_steps() {
        // +1 ttid within a bank moves 512 registers, +1 base register moves 1
        for t in [1i64, 2, 50, 99] {
            let unit = unit_id(DeviceCategory::Row, AddressingMode::Ttid, t).unwrap();
            let next_unit = unit_id(DeviceCategory::Row, AddressingMode::Ttid, t + 1).unwrap();
            assert_eq!(unit, next_unit);
            let a0 =
                start_address(DeviceCategory::Row, AddressingMode::Ttid, t, unit, 0).unwrap();
            let a1 = start_address(DeviceCategory::Row, AddressingMode::Ttid, t + 1, unit, 0)
                .unwrap();
            assert_eq!(a1 - a0, 512);
            let b1 =
                start_address(DeviceCategory::Row, AddressingMode::Ttid, t, unit, 1).unwrap();
            assert_eq!(b1 - a0, 1);
        }
    }

    #[test]
    fn test_flat_paging_for_weather() {
        let addr =
            start_address(DeviceCategory::Weather, AddressingMode::Ttid, 3, 101, 20).unwrap();
        assert_eq!(addr, 2 * 512 + 20);
    }

    #[test]
    fn test_network_ttid_has_offset_position_does_not() {
        let addr =
            start_address(DeviceCategory::Network, AddressingMode::Ttid, 1, 100, 10).unwrap();
        assert_eq!(addr, 10);

        let addr =
            start_address(DeviceCategory::Network, AddressingMode::Position, 1, 0, 10).unwrap();
        assert_eq!(addr, 512 + 10);
        let addr =
            start_address(DeviceCategory::Network, AddressingMode::Position, 0, 0, 10).unwrap();
        assert_eq!(addr, 10);
    }

    // ========== Category parsing tests ==========

    #[test]
    fn test_category_from_str() {
        assert_eq!("Row".parse::<DeviceCategory>().unwrap(), DeviceCategory::Row);
        assert_eq!(
            " network ".parse::<DeviceCategory>().unwrap(),
            DeviceCategory::Network
        );
        let err = "toaster".parse::<DeviceCategory>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownDeviceCategory(_)));
    }
}
