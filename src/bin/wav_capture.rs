//! Serial microphone capture to WAV
//!
//! Triggers a microphone capture on the device console, collects the
//! line-framed sample stream, and writes it out as a mono 16 kHz 16-bit
//! PCM WAV file.
//!
//! Usage:
//!   wav-capture --port /dev/ttyACM0 --output capture.wav

use clap::Parser;
use ft232_power_monitor::capture::{read_capture, SAMPLE_RATE_HZ};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Console command that starts a capture on the device
const CAPTURE_COMMAND: &[u8] = b"hwv mic capture\r";

#[derive(Parser, Debug)]
#[command(name = "wav-capture")]
#[command(about = "Record a serial microphone capture to a WAV file", long_about = None)]
struct Args {
    /// Serial port of the device console
    #[arg(short, long)]
    port: String,

    /// Output WAV file path
    #[arg(short, long)]
    output: PathBuf,

    /// Baud rate of the device console
    #[arg(long, default_value = "115200")]
    baud: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut port = serialport::new(&args.port, args.baud)
        .timeout(Duration::from_secs(1))
        .open()?;

    // Kick off the capture, then drop the command echo line
    port.write_all(CAPTURE_COMMAND)?;
    let mut reader = BufReader::new(port);
    let mut echo = String::new();
    reader.read_line(&mut echo)?;

    println!("Capturing from {}...", args.port);
    let samples = read_capture(&mut reader)?;
    println!(
        "Captured {} samples ({:.2} s)",
        samples.len(),
        samples.len() as f64 / SAMPLE_RATE_HZ as f64
    );

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE_HZ,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&args.output, spec)?;
    for sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    println!("Wrote {}", args.output.display());
    Ok(())
}
