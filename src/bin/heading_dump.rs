//! Print every heading the sensor sends, one per line, without rendering.

use std::{io::Write, process::ExitCode, time::Duration};

use clap::Parser;
use imu_heading::{
    config::{DEFAULT_BAUD, DEFAULT_PORT, SerialConfig},
    decoder::LineDecoder,
    serial,
};
use tracing::{Level, error};

#[derive(Parser, Debug)]
#[command(about = "Print decoded IMU headings")]
struct Args {
    #[arg(short = 'p', long = "com", default_value = DEFAULT_PORT)]
    port: String,

    #[arg(short = 'r', long, default_value_t = DEFAULT_BAUD)]
    baudrate: u32,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::fmt()
        .with_max_level(Level::INFO)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = SerialConfig {
        port: args.port,
        baud_rate: args.baudrate,
        timeout: Duration::from_millis(500),
    };

    let port = match serial::open(&config) {
        Ok(port) => port,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut decoder = LineDecoder::new(port);
    let mut stdout = std::io::stdout().lock();

    loop {
        match decoder.read_next() {
            Ok(Some(heading)) => {
                if writeln!(stdout, "{heading}").is_err() {
                    return ExitCode::SUCCESS;
                }
            }
            Ok(None) => (),
            Err(e) => {
                error!("Serial read failed: {e}");
                return ExitCode::FAILURE;
            }
        }
    }
}
