//! Register transport over FTDI MPSSE I2C
//!
//! The sensor driver talks to the device through the [`RegisterBus`] trait so
//! it can be exercised against a simulated register file in tests. [`FtdiI2c`]
//! is the hardware implementation, backed by libMPSSE.

use crate::error::Result;
#[cfg(feature = "ftdi")]
use crate::error::PowerMonitorError;
#[cfg(feature = "ftdi")]
use crate::ffi::*;
#[cfg(feature = "ftdi")]
use std::ptr;

/// Register-oriented bus transactions against an addressed device.
///
/// A register read is two bus transactions (register pointer write, then data
/// read) and is not atomic; callers must serialize access to a shared bus.
pub trait RegisterBus {
    /// Read `buf.len()` bytes from `register` of the device at `address`.
    fn read(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<()>;

    /// Write `data` to `register` of the device at `address`.
    fn write(&mut self, address: u8, register: u8, data: &[u8]) -> Result<()>;
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn read(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<()> {
        (**self).read(address, register, buf)
    }

    fn write(&mut self, address: u8, register: u8, data: &[u8]) -> Result<()> {
        (**self).write(address, register, data)
    }
}

/// I2C bus on an FT232H MPSSE channel
#[cfg(feature = "ftdi")]
pub struct FtdiI2c {
    handle: FT_HANDLE,
}

#[cfg(feature = "ftdi")]
impl FtdiI2c {
    /// Open and configure an MPSSE I2C channel.
    ///
    /// # Arguments
    /// * `channel_index` - Index of the I2C channel to use (usually 0)
    pub fn open(channel_index: u32) -> Result<Self> {
        // Check number of available channels
        let mut num_channels: DWORD = 0;
        let status = unsafe { I2C_GetNumChannels(&mut num_channels) };
        if status != FT_OK {
            return Err(status.into());
        }

        if num_channels == 0 {
            return Err(PowerMonitorError::NoChannelsFound);
        }

        if channel_index >= num_channels {
            return Err(PowerMonitorError::InvalidChannel(channel_index));
        }

        // Open the channel
        let mut handle: FT_HANDLE = ptr::null_mut();
        let status = unsafe { I2C_OpenChannel(channel_index, &mut handle) };
        if status != FT_OK {
            return Err(status.into());
        }

        // Configure the channel; the INA226 supports fast mode
        let mut config = ChannelConfig {
            ClockRate: I2C_CLOCK_FAST_MODE, // 400 kHz
            LatencyTimer: 1,                // 1ms latency (minimum stable value)
            Options: 0,
            Pin: 0,
            currentPinState: 0,
        };

        let status = unsafe { I2C_InitChannel(handle, &mut config) };
        if status != FT_OK {
            unsafe { I2C_CloseChannel(handle) };
            return Err(status.into());
        }

        Ok(FtdiI2c { handle })
    }
}

#[cfg(feature = "ftdi")]
impl RegisterBus for FtdiI2c {
    fn read(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<()> {
        let mut reg_buf = [register];
        let mut transferred: DWORD = 0;

        // Write register pointer (without STOP - keep bus for read)
        let options = I2C_TRANSFER_OPTIONS_START_BIT | I2C_TRANSFER_OPTIONS_BREAK_ON_NACK;

        let status = unsafe {
            I2C_DeviceWrite(
                self.handle,
                address,
                1,
                reg_buf.as_mut_ptr(),
                &mut transferred,
                options,
            )
        };

        if status != FT_OK {
            return Err(status.into());
        }

        // Read the data immediately (repeated START)
        transferred = 0;

        let options = I2C_TRANSFER_OPTIONS_START_BIT
            | I2C_TRANSFER_OPTIONS_STOP_BIT
            | I2C_TRANSFER_OPTIONS_NACK_LAST_BYTE;

        let status = unsafe {
            I2C_DeviceRead(
                self.handle,
                address,
                buf.len() as DWORD,
                buf.as_mut_ptr(),
                &mut transferred,
                options,
            )
        };

        if status != FT_OK {
            return Err(status.into());
        }

        if transferred != buf.len() as DWORD {
            return Err(PowerMonitorError::TransferError {
                expected: buf.len() as u32,
                actual: transferred,
            });
        }

        Ok(())
    }

    fn write(&mut self, address: u8, register: u8, data: &[u8]) -> Result<()> {
        // Register byte followed by the payload in one transaction
        let mut buffer = Vec::with_capacity(1 + data.len());
        buffer.push(register);
        buffer.extend_from_slice(data);

        let mut transferred: DWORD = 0;

        let options = I2C_TRANSFER_OPTIONS_START_BIT
            | I2C_TRANSFER_OPTIONS_STOP_BIT
            | I2C_TRANSFER_OPTIONS_BREAK_ON_NACK;

        let status = unsafe {
            I2C_DeviceWrite(
                self.handle,
                address,
                buffer.len() as DWORD,
                buffer.as_mut_ptr(),
                &mut transferred,
                options,
            )
        };

        if status != FT_OK {
            return Err(status.into());
        }

        if transferred != buffer.len() as DWORD {
            return Err(PowerMonitorError::TransferError {
                expected: buffer.len() as u32,
                actual: transferred,
            });
        }

        Ok(())
    }
}

#[cfg(feature = "ftdi")]
impl Drop for FtdiI2c {
    fn drop(&mut self) {
        unsafe {
            I2C_CloseChannel(self.handle);
        }
    }
}
