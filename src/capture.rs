//! Line-framed serial audio capture protocol
//!
//! The device firmware streams a microphone capture over its serial console
//! as decimal sample values, one per line, between an `"S"` start sentinel
//! and an `"E"` end sentinel. This module parses that stream; it shares no
//! logic with the power rail driver.

use crate::error::{PowerMonitorError, Result};
use std::io::{self, BufRead};

/// Sample rate of the device microphone capture
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Consume a capture stream and collect its samples.
///
/// Start sentinel lines are skipped, every other line is parsed as a signed
/// 16-bit decimal sample, and reading stops at the end sentinel. A stream
/// that ends without the end sentinel is an error.
pub fn read_capture<R: BufRead>(reader: R) -> Result<Vec<i16>> {
    let mut samples = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        match line {
            "S" => continue,
            "E" => return Ok(samples),
            value => {
                let sample = value.parse::<i16>().map_err(|_| {
                    PowerMonitorError::MalformedCaptureLine(value.to_string())
                })?;
                samples.push(sample);
            }
        }
    }

    Err(PowerMonitorError::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "capture stream ended without end sentinel",
    )))
}
