//! Power rail table for the board under test
//!
//! Maps each monitored rail to the I2C address of its INA226 and the
//! current LSB chosen for its expected load. High-draw rails (USB, battery,
//! system) use a 0.1 mA LSB; the low-power peripheral rails use 1 uA.

use crate::ina226::CurrentSpec;

/// Shunt resistance shared by every rail on the board, ohms
pub const R_SHUNT: f64 = 0.5;

/// One monitored power rail
#[derive(Debug, Clone, Copy)]
pub struct Rail {
    /// Rail name as printed on the schematic
    pub name: &'static str,
    /// I2C address of the rail's INA226
    pub address: u8,
    /// Current range configuration for the rail
    pub current: CurrentSpec,
}

const LSB_100UA: CurrentSpec = CurrentSpec::CurrentLsb(1e-4);
const LSB_1UA: CurrentSpec = CurrentSpec::CurrentLsb(1e-6);

/// All monitored rails, in bus address order
pub const RAILS: &[Rail] = &[
    Rail { name: "VUSB", address: 0x40, current: LSB_100UA },
    Rail { name: "VBAT", address: 0x41, current: LSB_100UA },
    Rail { name: "VSYS", address: 0x42, current: LSB_100UA },
    Rail { name: "LIGHT", address: 0x43, current: LSB_1UA },
    Rail { name: "nPM_1.8V", address: 0x44, current: LSB_1UA },
    Rail { name: "nPM_3.0V", address: 0x45, current: LSB_1UA },
    Rail { name: "VDDIO", address: 0x46, current: LSB_1UA },
    Rail { name: "FLASH", address: 0x47, current: LSB_1UA },
    Rail { name: "VBUS_O", address: 0x48, current: LSB_100UA },
    Rail { name: "VDD_nRF", address: 0x49, current: LSB_1UA },
    Rail { name: "LCD", address: 0x4A, current: LSB_1UA },
    Rail { name: "LED", address: 0x4B, current: LSB_1UA },
    Rail { name: "SENSOR_1.8V", address: 0x4C, current: LSB_1UA },
    Rail { name: "SPK", address: 0x4D, current: LSB_1UA },
    Rail { name: "MIC", address: 0x4E, current: LSB_1UA },
    Rail { name: "LRA", address: 0x4F, current: LSB_1UA },
];

/// Look up a rail by name
pub fn find(name: &str) -> Option<&'static Rail> {
    RAILS.iter().find(|rail| rail.name == name)
}
