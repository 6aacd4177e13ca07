//! Pretend to be the sensor: write a slowly turning heading to a port.
//!
//! Handy with a virtual serial pair, e.g.
//! `socat -d -d pty,raw,echo=0 pty,raw,echo=0`.

use std::{io::Write, process::ExitCode, thread::sleep, time::Duration};

use clap::Parser;
use imu_heading::{
    Heading,
    config::{DEFAULT_BAUD, DEFAULT_PORT, SerialConfig},
    serial,
};
use tracing::{Level, debug, error, info};

#[derive(Parser, Debug)]
#[command(about = "Write a sweeping heading to a serial port")]
struct Args {
    #[arg(short = 'p', long = "com", default_value = DEFAULT_PORT)]
    port: String,

    #[arg(short = 'r', long, default_value_t = DEFAULT_BAUD)]
    baudrate: u32,

    /// Degrees to turn between records
    #[arg(long, default_value_t = 5)]
    step: u16,

    /// Milliseconds between records
    #[arg(long, default_value_t = 50)]
    interval_ms: u64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::fmt()
        .with_max_level(Level::INFO)
        .with_file(false)
        .init();

    let args = Args::parse();
    let config = SerialConfig {
        port: args.port,
        baud_rate: args.baudrate,
        ..SerialConfig::default()
    };

    let mut port = match serial::open(&config) {
        Ok(port) => port,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    info!("Sweeping {} degrees every {} ms", args.step, args.interval_ms);

    let mut heading = Heading::NORTH;
    loop {
        let record = format!("H{heading}\n");
        if let Err(e) = port.write_all(record.as_bytes()).and_then(|()| port.flush()) {
            error!("Serial write failed: {e}");
            return ExitCode::FAILURE;
        }
        debug!("Sent {}", record.trim_end());

        heading = Heading::from_degrees(heading.degrees() + args.step % 360);
        sleep(Duration::from_millis(args.interval_ms));
    }
}
