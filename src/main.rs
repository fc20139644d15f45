//! Power rail monitor - Continuous rail measurement display
//!
//! Selects a named power rail, opens its INA226 via the FT232H I2C bridge,
//! and prints bus voltage, shunt voltage, current, and power on a fixed
//! cadence, overwriting a single status line.

use clap::Parser;
use ft232_power_monitor::{rails, CurrentSpec, FtdiI2c, Ina226, PowerMonitorError};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "power-monitor")]
#[command(about = "Monitor a power rail through its INA226", long_about = None)]
struct Args {
    /// Power rail to monitor (see --list)
    #[arg(short = 'b', long, required_unless_present = "list")]
    rail: Option<String>,

    /// Index of the FT232H I2C channel to use
    #[arg(short, long, default_value = "0")]
    channel: u32,

    /// Polling interval in milliseconds
    #[arg(short, long, default_value = "500")]
    interval: u64,

    /// List the known rails and exit
    #[arg(long)]
    list: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.list {
        for rail in rails::RAILS {
            let lsb = match rail.current {
                CurrentSpec::CurrentLsb(amps) => format!("{:.0} uA/LSB", amps * 1e6),
                CurrentSpec::MaxCurrent(amps) => format!("{amps} A full scale"),
            };
            println!("{:<12} 0x{:02X}  {}", rail.name, rail.address, lsb);
        }
        return Ok(());
    }

    let Some(rail_name) = args.rail else {
        // clap enforces --rail unless --list was given
        eprintln!("Error: --rail is required");
        std::process::exit(1);
    };
    let rail = match rails::find(&rail_name) {
        Some(rail) => rail,
        None => {
            eprintln!("Error: unknown rail '{}'", rail_name);
            eprintln!("Known rails:");
            for rail in rails::RAILS {
                eprintln!("  {}", rail.name);
            }
            std::process::exit(1);
        }
    };

    let bus = match FtdiI2c::open(args.channel) {
        Ok(bus) => bus,
        Err(PowerMonitorError::NoChannelsFound) => {
            eprintln!("Error: No FT232H devices found.");
            eprintln!("Please check:");
            eprintln!("  1. FT232H is connected via USB");
            eprintln!("  2. FTDI drivers are installed");
            eprintln!("  3. No other application is using the device");
            return Err(Box::new(PowerMonitorError::NoChannelsFound));
        }
        Err(e) => {
            eprintln!("Error opening I2C channel: {}", e);
            return Err(Box::new(e));
        }
    };

    let mut sensor = match Ina226::new(bus, rail.address, rail.current, rails::R_SHUNT) {
        Ok(s) => s,
        Err(e @ PowerMonitorError::UnexpectedDeviceIdentity { .. }) => {
            eprintln!("Error: {}", e);
            eprintln!("Wrong device or address on the bus; check the rail wiring.");
            return Err(Box::new(e));
        }
        Err(e) => {
            eprintln!("Error initializing INA226 at 0x{:02X}: {}", rail.address, e);
            return Err(Box::new(e));
        }
    };

    if sensor.resolution_adjusted() {
        eprintln!(
            "Note: requested current range clamped; effective LSB is {:.3} uA",
            sensor.current_lsb() * 1e6
        );
    }

    // Ctrl+C finishes the status line and exits cleanly
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let interval = Duration::from_millis(args.interval);

    while running.load(Ordering::SeqCst) {
        let result = sensor.bus_voltage().and_then(|bus_v| {
            let shunt_v = sensor.shunt_voltage()?;
            let current = sensor.current()?;
            let power = sensor.power()?;
            Ok((bus_v, shunt_v, current, power))
        });

        match result {
            Ok((bus_v, shunt_v, current, power)) => {
                print!(
                    "{}: {:.3} V, {:.3} mV, {:.3} mA, {:.3} mW\r",
                    rail.name,
                    bus_v,
                    shunt_v * 1000.0,
                    current * 1000.0,
                    power * 1000.0
                );
                io::stdout().flush()?;
            }
            Err(e) => {
                println!();
                eprintln!("Error reading sensor: {}", e);
                return Err(Box::new(e));
            }
        }

        thread::sleep(interval);
    }

    println!();
    Ok(())
}
