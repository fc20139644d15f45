//! FT232H-based power rail monitor for the INA226
//!
//! This library drives the TI INA226 current/voltage/power monitor over I2C
//! using the FTDI FT232H USB bridge via the libMPSSE library. A board under
//! test carries one INA226 per power rail; the driver verifies the device
//! identity, programs its calibration from the rail's target current range,
//! and converts raw register reads into volts, amps, and watts.
//!
//! # Quick Start
//!
//! ## Monitoring a rail
//! Requires the `ftdi` feature and the FTDI libraries at link time:
//! ```ignore
//! use ft232_power_monitor::{rails, FtdiI2c, Ina226};
//!
//! let rail = rails::find("VBAT").unwrap();
//! let bus = FtdiI2c::open(0)?;
//! let mut sensor = Ina226::new(bus, rail.address, rail.current, rails::R_SHUNT)?;
//!
//! println!("{}: {:.3} V, {:.3} mA", rail.name,
//!     sensor.bus_voltage()?, sensor.current()? * 1000.0);
//! # Ok::<(), ft232_power_monitor::PowerMonitorError>(())
//! ```
//!
//! ## Custom current range
//! ```ignore
//! use ft232_power_monitor::{CurrentSpec, FtdiI2c, Ina226};
//!
//! let bus = FtdiI2c::open(0)?;
//!
//! // Expect up to 2 A through the 0.5 ohm shunt at address 0x40
//! let mut sensor = Ina226::new(bus, 0x40, CurrentSpec::MaxCurrent(2.0), 0.5)?;
//!
//! if sensor.resolution_adjusted() {
//!     eprintln!("range clamped; LSB is {} A", sensor.current_lsb());
//! }
//! # Ok::<(), ft232_power_monitor::PowerMonitorError>(())
//! ```
//!
//! The driver is generic over the [`RegisterBus`] transport, so it can run
//! against a simulated register file in tests; `FtdiI2c` (behind the `ftdi`
//! feature) is the hardware implementation.
//!
//! Each accessor performs one fresh bus transaction and nothing is cached;
//! calls against a shared bus must be externally serialized.

pub mod bus;
pub mod capture;
pub mod error;
#[cfg(feature = "ftdi")]
mod ffi;
pub mod ina226;
pub mod rails;

// Re-export public API
#[cfg(feature = "ftdi")]
pub use bus::FtdiI2c;
pub use bus::RegisterBus;
pub use error::{IdentityField, PowerMonitorError, Result};
pub use ina226::{
    derive_calibration, Averaging, Calibration, ConversionTime, CurrentSpec, Ina226,
    OperatingMode, SensorConfig,
};
pub use rails::{Rail, RAILS, R_SHUNT};
