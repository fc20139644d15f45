//! INA226 current/voltage/power monitor driver
//!
//! The driver owns one bus address. Construction verifies the device
//! identity, derives and writes the calibration register, then writes the
//! mode/timing configuration. Afterwards each accessor performs one fresh
//! 2-byte register read and converts the raw value to physical units.

use crate::bus::RegisterBus;
use crate::error::{IdentityField, PowerMonitorError, Result};
use std::time::Duration;

// INA226 register addresses, all 16-bit big-endian
const REG_CONFIG: u8 = 0x00;
const REG_SHUNT_VOLTAGE: u8 = 0x01;
const REG_BUS_VOLTAGE: u8 = 0x02;
const REG_POWER: u8 = 0x03;
const REG_CURRENT: u8 = 0x04;
const REG_CALIBRATION: u8 = 0x05;
const REG_MANUFACTURER_ID: u8 = 0xFE;
const REG_DIE_ID: u8 = 0xFF;

// Expected identity register values (TI, INA226 die)
const MANUFACTURER_ID: u16 = 0x5449;
const DIE_ID: u16 = 0x2260;

// Fixed internal scaling of the calibration equation, datasheet section 6.5
const INTERNAL_SCALING: f64 = 0.00512;

/// Bus voltage register LSB, volts (1.25 mV)
pub const BUS_VOLTAGE_LSB: f64 = 0.00125;

/// Shunt voltage conversion factor, volts per count (0.25 mV), per the
/// established readout convention
pub const SHUNT_VOLTAGE_LSB: f64 = 0.00025;

// Power register counts are 25x the current LSB by device definition
const POWER_LSB_FACTOR: f64 = 25.0;

// A full-scale current maps onto the 15-bit positive range of the signed
// current register
const CURRENT_LSB_DIVISOR: f64 = 32768.0;

// Configuration register field offsets
const MODE_SHIFT: u16 = 0;
const SHUNT_CT_SHIFT: u16 = 3;
const BUS_CT_SHIFT: u16 = 6;
const AVG_SHIFT: u16 = 9;

/// Operating mode field (configuration register bits 0-2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    PowerDown = 0x00,
    ShuntTriggered = 0x01,
    BusTriggered = 0x02,
    ShuntAndBusTriggered = 0x03,
    ShuntContinuous = 0x05,
    BusContinuous = 0x06,
    ShuntAndBusContinuous = 0x07,
}

/// Conversion time field, used for both the shunt (bits 3-5) and bus
/// (bits 6-8) conversion time selections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionTime {
    Us140 = 0,
    Us204 = 1,
    Us332 = 2,
    Us588 = 3,
    Us1100 = 4,
    Us2116 = 5,
    Us4156 = 6,
    Us8244 = 7,
}

impl ConversionTime {
    /// Duration of a single conversion in microseconds
    pub fn micros(self) -> u64 {
        match self {
            ConversionTime::Us140 => 140,
            ConversionTime::Us204 => 204,
            ConversionTime::Us332 => 332,
            ConversionTime::Us588 => 588,
            ConversionTime::Us1100 => 1100,
            ConversionTime::Us2116 => 2116,
            ConversionTime::Us4156 => 4156,
            ConversionTime::Us8244 => 8244,
        }
    }
}

/// Averaging sample count field (configuration register bits 9-11)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Averaging {
    X1 = 0,
    X4 = 1,
    X16 = 2,
    X64 = 3,
    X128 = 4,
    X256 = 5,
    X512 = 6,
    X1024 = 7,
}

impl Averaging {
    /// Number of samples averaged per register update
    pub fn count(self) -> u64 {
        match self {
            Averaging::X1 => 1,
            Averaging::X4 => 4,
            Averaging::X16 => 16,
            Averaging::X64 => 64,
            Averaging::X128 => 128,
            Averaging::X256 => 256,
            Averaging::X512 => 512,
            Averaging::X1024 => 1024,
        }
    }
}

/// Mode/timing configuration written to the configuration register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorConfig {
    pub mode: OperatingMode,
    pub shunt_ct: ConversionTime,
    pub bus_ct: ConversionTime,
    pub averaging: Averaging,
}

impl SensorConfig {
    /// Pack the fields into the 16-bit configuration word
    pub fn encode(self) -> u16 {
        (self.mode as u16) << MODE_SHIFT
            | (self.shunt_ct as u16) << SHUNT_CT_SHIFT
            | (self.bus_ct as u16) << BUS_CT_SHIFT
            | (self.averaging as u16) << AVG_SHIFT
    }

    /// Time for one averaged shunt+bus conversion cycle.
    ///
    /// The readable registers update once per cycle, so this is the
    /// effective sample latency. At the defaults (1.1 ms shunt + 1.1 ms bus,
    /// 256 averages) that is 563.2 ms.
    pub fn total_conversion_time(self) -> Duration {
        Duration::from_micros(
            (self.shunt_ct.micros() + self.bus_ct.micros()) * self.averaging.count(),
        )
    }
}

impl Default for SensorConfig {
    /// Continuous shunt+bus conversion, 1.1 ms conversion times, 256
    /// averages. Slow, but gives a stable reading across a wide dynamic
    /// range of rail currents.
    fn default() -> Self {
        Self {
            mode: OperatingMode::ShuntAndBusContinuous,
            shunt_ct: ConversionTime::Us1100,
            bus_ct: ConversionTime::Us1100,
            averaging: Averaging::X256,
        }
    }
}

/// Target measurement range for a monitored rail
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurrentSpec {
    /// Expected full-scale current in amperes; the current LSB is derived
    /// as `amps / 32768`
    MaxCurrent(f64),
    /// Current LSB in amperes, used as-is
    CurrentLsb(f64),
}

/// Calibration register value and the current LSB it encodes.
///
/// The two are kept mutually consistent:
/// `value == floor(0.00512 / (current_lsb * shunt_ohms))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Word written to the calibration register
    pub value: u16,
    /// Amperes represented by one count of the current register
    pub current_lsb: f64,
    /// True when the requested range overflowed the register and the LSB
    /// was coarsened to fit
    pub adjusted: bool,
}

/// Derive the calibration register value for a target current range.
///
/// Pure; performs no device I/O. When the requested range would need a
/// calibration value above the 16-bit maximum, the value is clamped to
/// 65535 and the current LSB recomputed from the clamp, with `adjusted`
/// set so callers can report the coarser resolution.
pub fn derive_calibration(current: CurrentSpec, shunt_ohms: f64) -> Result<Calibration> {
    if !shunt_ohms.is_finite() || shunt_ohms <= 0.0 {
        return Err(PowerMonitorError::InvalidParameter(format!(
            "Shunt resistance must be positive, got {shunt_ohms}"
        )));
    }

    let requested_lsb = match current {
        CurrentSpec::MaxCurrent(amps) => amps / CURRENT_LSB_DIVISOR,
        CurrentSpec::CurrentLsb(amps) => amps,
    };

    if !requested_lsb.is_finite() || requested_lsb <= 0.0 {
        return Err(PowerMonitorError::InvalidParameter(format!(
            "Current LSB must be positive, got {requested_lsb} A"
        )));
    }

    let raw = INTERNAL_SCALING / (requested_lsb * shunt_ohms);
    if raw >= f64::from(u16::MAX) + 1.0 {
        // Floored value would overflow the register: clamp and accept a
        // coarser current LSB
        let current_lsb = INTERNAL_SCALING / (f64::from(u16::MAX) * shunt_ohms);
        return Ok(Calibration {
            value: u16::MAX,
            current_lsb,
            adjusted: true,
        });
    }

    let value = raw as u16; // truncation == floor for positive values
    if value == 0 {
        return Err(PowerMonitorError::CalibrationOutOfRange {
            current_lsb: requested_lsb,
            shunt_ohms,
        });
    }

    Ok(Calibration {
        value,
        current_lsb: requested_lsb,
        adjusted: false,
    })
}

fn read_u16<B: RegisterBus>(bus: &mut B, address: u8, register: u8) -> Result<u16> {
    let mut buf = [0u8; 2];
    bus.read(address, register, &mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

fn write_u16<B: RegisterBus>(bus: &mut B, address: u8, register: u8, value: u16) -> Result<()> {
    bus.write(address, register, &value.to_be_bytes())
}

/// INA226 driver, one instance per monitored rail
#[derive(Debug)]
pub struct Ina226<B> {
    bus: B,
    address: u8,
    calibration: Calibration,
}

impl<B: RegisterBus> Ina226<B> {
    /// Open the device at `address`, verify its identity, and program the
    /// calibration and configuration registers.
    ///
    /// Identity is checked before anything is written; the wrong device on
    /// the bus fails fast with no register touched. Writes are not rolled
    /// back on a later failure (the device is stateless across power
    /// cycles), but no driver value is returned either.
    ///
    /// # Arguments
    /// * `bus` - Register transport the device is reachable on
    /// * `address` - I2C address of the device
    /// * `current` - Target current range or explicit current LSB
    /// * `shunt_ohms` - Shunt resistance on the rail
    pub fn new(mut bus: B, address: u8, current: CurrentSpec, shunt_ohms: f64) -> Result<Self> {
        let manufacturer_id = read_u16(&mut bus, address, REG_MANUFACTURER_ID)?;
        if manufacturer_id != MANUFACTURER_ID {
            return Err(PowerMonitorError::UnexpectedDeviceIdentity {
                field: IdentityField::ManufacturerId,
                expected: MANUFACTURER_ID,
                actual: manufacturer_id,
            });
        }

        let die_id = read_u16(&mut bus, address, REG_DIE_ID)?;
        if die_id != DIE_ID {
            return Err(PowerMonitorError::UnexpectedDeviceIdentity {
                field: IdentityField::DieId,
                expected: DIE_ID,
                actual: die_id,
            });
        }

        let calibration = derive_calibration(current, shunt_ohms)?;
        write_u16(&mut bus, address, REG_CALIBRATION, calibration.value)?;

        write_u16(&mut bus, address, REG_CONFIG, SensorConfig::default().encode())?;

        Ok(Ina226 {
            bus,
            address,
            calibration,
        })
    }

    /// I2C address of the device
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Amperes per count of the current register
    pub fn current_lsb(&self) -> f64 {
        self.calibration.current_lsb
    }

    /// True when the requested current range was coarsened to fit the
    /// calibration register; readings are valid but lower-resolution than
    /// asked for
    pub fn resolution_adjusted(&self) -> bool {
        self.calibration.adjusted
    }

    /// Bus voltage in volts
    pub fn bus_voltage(&mut self) -> Result<f64> {
        let raw = read_u16(&mut self.bus, self.address, REG_BUS_VOLTAGE)?;
        Ok(f64::from(raw) * BUS_VOLTAGE_LSB)
    }

    /// Shunt voltage in volts.
    ///
    /// The register is two's-complement signed, but the value is converted
    /// as unsigned to match the established readout convention; raw values
    /// above 0x7FFF represent negative shunt voltage and come out large.
    pub fn shunt_voltage(&mut self) -> Result<f64> {
        let raw = read_u16(&mut self.bus, self.address, REG_SHUNT_VOLTAGE)?;
        Ok(f64::from(raw) * SHUNT_VOLTAGE_LSB)
    }

    /// Rail current in amperes
    pub fn current(&mut self) -> Result<f64> {
        let raw = read_u16(&mut self.bus, self.address, REG_CURRENT)?;
        Ok(f64::from(raw) * self.calibration.current_lsb)
    }

    /// Rail power in watts
    pub fn power(&mut self) -> Result<f64> {
        let raw = read_u16(&mut self.bus, self.address, REG_POWER)?;
        Ok(f64::from(raw) * POWER_LSB_FACTOR * self.calibration.current_lsb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const ADDR: u8 = 0x40;
    const SHUNT: f64 = 0.5;

    /// Simulated INA226 register file
    #[derive(Debug)]
    struct FakeBus {
        regs: HashMap<u8, u16>,
        writes: Vec<(u8, u16)>,
        fail_register: Option<u8>,
    }

    impl FakeBus {
        fn new() -> Self {
            let mut regs = HashMap::new();
            regs.insert(REG_MANUFACTURER_ID, MANUFACTURER_ID);
            regs.insert(REG_DIE_ID, DIE_ID);
            FakeBus {
                regs,
                writes: Vec::new(),
                fail_register: None,
            }
        }

        fn set(&mut self, register: u8, value: u16) {
            self.regs.insert(register, value);
        }
    }

    impl RegisterBus for FakeBus {
        fn read(&mut self, _address: u8, register: u8, buf: &mut [u8]) -> Result<()> {
            if self.fail_register == Some(register) {
                return Err(PowerMonitorError::TransferError {
                    expected: buf.len() as u32,
                    actual: 0,
                });
            }
            let value = self.regs.get(&register).copied().unwrap_or(0);
            buf.copy_from_slice(&value.to_be_bytes());
            Ok(())
        }

        fn write(&mut self, _address: u8, register: u8, data: &[u8]) -> Result<()> {
            assert_eq!(data.len(), 2, "all INA226 registers are 16-bit");
            let value = u16::from_be_bytes([data[0], data[1]]);
            self.regs.insert(register, value);
            self.writes.push((register, value));
            Ok(())
        }
    }

    #[test]
    fn config_encoding_packs_each_field() {
        let config = SensorConfig {
            mode: OperatingMode::ShuntAndBusContinuous,
            shunt_ct: ConversionTime::Us1100,
            bus_ct: ConversionTime::Us1100,
            averaging: Averaging::X256,
        };
        let word = config.encode();

        // bits 0-2: mode, bits 3-5: shunt CT, bits 6-8: bus CT, bits 9-11: avg
        assert_eq!(word & 0x0007, 0x07);
        assert_eq!((word >> 3) & 0x07, 4);
        assert_eq!((word >> 6) & 0x07, 4);
        assert_eq!((word >> 9) & 0x07, 5);
        assert_eq!(word >> 12, 0);
        assert_eq!(word, 0x0B27);
    }

    #[test]
    fn default_config_conversion_latency() {
        // (1100us shunt + 1100us bus) x 256 averages
        assert_eq!(
            SensorConfig::default().total_conversion_time(),
            Duration::from_micros(563_200)
        );
    }

    #[test]
    fn calibration_from_max_current() {
        let cal = derive_calibration(CurrentSpec::MaxCurrent(2.0), SHUNT).unwrap();
        assert_eq!(cal.current_lsb, 2.0 / 32768.0);
        // floor(0.00512 / (current_lsb * 0.5))
        assert_eq!(cal.value, 167);
        assert!(!cal.adjusted);
    }

    #[test]
    fn calibration_from_explicit_lsb() {
        let cal = derive_calibration(CurrentSpec::CurrentLsb(1e-4), SHUNT).unwrap();
        assert_eq!(cal.current_lsb, 1e-4);
        assert_eq!(cal.value, 102); // floor(102.4)
        assert!(!cal.adjusted);
    }

    #[test]
    fn calibration_clamps_and_stays_consistent() {
        let cal = derive_calibration(CurrentSpec::CurrentLsb(1e-7), SHUNT).unwrap();
        assert_eq!(cal.value, 65535);
        assert!(cal.adjusted);
        assert!(cal.current_lsb > 1e-7);
        // Round trip: the recomputed LSB must floor back to the clamp
        let round_trip = (INTERNAL_SCALING / (cal.current_lsb * SHUNT)) as u16;
        assert_eq!(round_trip, 65535);
    }

    #[test]
    fn calibration_at_register_maximum_is_not_clamped() {
        // Lands the raw quotient between 65535 and 65536; the floored value
        // still fits the register, so the requested LSB must be kept
        let requested = INTERNAL_SCALING / (SHUNT * 65535.5);
        let cal = derive_calibration(CurrentSpec::CurrentLsb(requested), SHUNT).unwrap();
        assert_eq!(cal.value, 65535);
        assert!(!cal.adjusted);
        assert_eq!(cal.current_lsb, requested);
    }

    #[test]
    fn calibration_of_zero_is_rejected() {
        let err = derive_calibration(CurrentSpec::CurrentLsb(1.0), SHUNT).unwrap_err();
        assert!(matches!(
            err,
            PowerMonitorError::CalibrationOutOfRange { .. }
        ));
    }

    #[test]
    fn nonpositive_inputs_are_rejected() {
        assert!(derive_calibration(CurrentSpec::MaxCurrent(0.0), SHUNT).is_err());
        assert!(derive_calibration(CurrentSpec::CurrentLsb(-1e-6), SHUNT).is_err());
        assert!(derive_calibration(CurrentSpec::CurrentLsb(1e-6), 0.0).is_err());
    }

    #[test]
    fn construction_programs_calibration_then_config() {
        let mut bus = FakeBus::new();
        let driver = Ina226::new(&mut bus, ADDR, CurrentSpec::CurrentLsb(1e-4), SHUNT).unwrap();
        assert_eq!(driver.address(), ADDR);
        assert!(!driver.resolution_adjusted());
        drop(driver);

        assert_eq!(
            bus.writes,
            vec![(REG_CALIBRATION, 102), (REG_CONFIG, 0x0B27)]
        );
    }

    #[test]
    fn wrong_manufacturer_id_fails_before_any_write() {
        let mut bus = FakeBus::new();
        bus.set(REG_MANUFACTURER_ID, 0x1234);

        let err = Ina226::new(&mut bus, ADDR, CurrentSpec::CurrentLsb(1e-4), SHUNT).unwrap_err();
        match err {
            PowerMonitorError::UnexpectedDeviceIdentity {
                field,
                expected,
                actual,
            } => {
                assert_eq!(field, IdentityField::ManufacturerId);
                assert_eq!(expected, 0x5449);
                assert_eq!(actual, 0x1234);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(bus.writes.is_empty());
    }

    #[test]
    fn wrong_die_id_fails_before_any_write() {
        let mut bus = FakeBus::new();
        bus.set(REG_DIE_ID, 0x2261);

        let err = Ina226::new(&mut bus, ADDR, CurrentSpec::CurrentLsb(1e-4), SHUNT).unwrap_err();
        match err {
            PowerMonitorError::UnexpectedDeviceIdentity { field, actual, .. } => {
                assert_eq!(field, IdentityField::DieId);
                assert_eq!(actual, 0x2261);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(bus.writes.is_empty());
    }

    #[test]
    fn bus_voltage_conversion() {
        let mut bus = FakeBus::new();
        bus.set(REG_BUS_VOLTAGE, 0x0190); // 400 counts x 1.25 mV
        let mut driver =
            Ina226::new(&mut bus, ADDR, CurrentSpec::CurrentLsb(1e-4), SHUNT).unwrap();
        let volts = driver.bus_voltage().unwrap();
        assert!((volts - 0.500).abs() < 1e-12);
    }

    #[test]
    fn shunt_voltage_is_read_as_unsigned() {
        let mut bus = FakeBus::new();
        bus.set(REG_SHUNT_VOLTAGE, 80);
        let mut driver =
            Ina226::new(&mut bus, ADDR, CurrentSpec::CurrentLsb(1e-4), SHUNT).unwrap();
        let volts = driver.shunt_voltage().unwrap();
        assert!((volts - 0.020).abs() < 1e-12);

        // Two's-complement negative raw values come out large, by convention
        let mut bus = FakeBus::new();
        bus.set(REG_SHUNT_VOLTAGE, 0xFFFF);
        let mut driver =
            Ina226::new(&mut bus, ADDR, CurrentSpec::CurrentLsb(1e-4), SHUNT).unwrap();
        assert!(driver.shunt_voltage().unwrap() > 16.0);
    }

    #[test]
    fn current_matches_requested_range_exactly() {
        let i_max = 3.0;
        let mut bus = FakeBus::new();
        bus.set(REG_CURRENT, 12345);
        let mut driver =
            Ina226::new(&mut bus, ADDR, CurrentSpec::MaxCurrent(i_max), SHUNT).unwrap();

        let amps = driver.current().unwrap();
        let expected = 12345.0 * (i_max / 32768.0);
        assert!((amps - expected).abs() <= expected * 1e-9);
    }

    #[test]
    fn power_applies_fixed_factor_of_25() {
        let mut bus = FakeBus::new();
        bus.set(REG_POWER, 1000);
        let mut driver =
            Ina226::new(&mut bus, ADDR, CurrentSpec::CurrentLsb(1e-4), SHUNT).unwrap();
        let watts = driver.power().unwrap();
        assert!((watts - 2.5).abs() < 1e-9);
    }

    #[test]
    fn transport_failure_propagates_without_corrupting_state() {
        let mut bus = FakeBus::new();
        bus.set(REG_CURRENT, 100);
        let mut driver =
            Ina226::new(&mut bus, ADDR, CurrentSpec::CurrentLsb(1e-4), SHUNT).unwrap();
        let lsb_before = driver.current_lsb();

        driver.bus.fail_register = Some(REG_CURRENT);
        let err = driver.current().unwrap_err();
        assert!(matches!(err, PowerMonitorError::TransferError { .. }));

        // The failed read changed nothing; the next one works as before
        driver.bus.fail_register = None;
        assert_eq!(driver.current_lsb(), lsb_before);
        let amps = driver.current().unwrap();
        assert!((amps - 100.0 * 1e-4).abs() < 1e-12);
    }

    #[test]
    fn construction_fails_when_identity_read_fails() {
        let mut bus = FakeBus::new();
        bus.fail_register = Some(REG_MANUFACTURER_ID);
        let err = Ina226::new(&mut bus, ADDR, CurrentSpec::CurrentLsb(1e-4), SHUNT).unwrap_err();
        assert!(matches!(err, PowerMonitorError::TransferError { .. }));
        assert!(bus.writes.is_empty());
    }
}
