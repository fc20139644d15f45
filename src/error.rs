//! Error types for the INA226 power monitor

use thiserror::Error;

/// Identity register that failed verification during driver construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
    ManufacturerId,
    DieId,
}

impl std::fmt::Display for IdentityField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityField::ManufacturerId => write!(f, "manufacturer ID"),
            IdentityField::DieId => write!(f, "die ID"),
        }
    }
}

/// Error type for power monitor operations
#[derive(Error, Debug)]
pub enum PowerMonitorError {
    /// FTDI driver error
    #[error("FTDI error: {status} ({description})")]
    FtdiError { status: u32, description: String },

    /// No I2C channels found
    #[error("No I2C channels found")]
    NoChannelsFound,

    /// Invalid channel index
    #[error("Invalid channel index: {0}")]
    InvalidChannel(u32),

    /// Data transfer error
    #[error("Data transfer error: expected {expected} bytes, transferred {actual}")]
    TransferError { expected: u32, actual: u32 },

    /// Wrong device (or wrong address) on the bus; fatal, not retriable
    #[error("Unexpected {field}: expected 0x{expected:04X}, got 0x{actual:04X}")]
    UnexpectedDeviceIdentity {
        field: IdentityField,
        expected: u16,
        actual: u16,
    },

    /// Requested current range cannot be represented by the calibration register
    #[error(
        "Calibration out of range: current LSB {current_lsb} A with shunt {shunt_ohms} ohm \
         yields a zero calibration value"
    )]
    CalibrationOutOfRange { current_lsb: f64, shunt_ohms: f64 },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Line that does not fit the serial capture framing
    #[error("Malformed capture line: {0:?}")]
    MalformedCaptureLine(String),

    /// I/O error from the serial link
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "ftdi")]
impl From<crate::ffi::FT_STATUS> for PowerMonitorError {
    fn from(status: crate::ffi::FT_STATUS) -> Self {
        if status == crate::ffi::FT_OK {
            panic!("Cannot convert FT_OK to error");
        }
        PowerMonitorError::FtdiError {
            status,
            description: crate::ffi::status_to_string(status).to_string(),
        }
    }
}

/// Result type for power monitor operations
pub type Result<T> = std::result::Result<T, PowerMonitorError>;
