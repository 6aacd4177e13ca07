use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};

#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM3";
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

pub const DEFAULT_BAUD: u32 = 115_200;

/// Render period of the display loop.
pub const DEFAULT_TICK_MS: u64 = 10;

/// Upper bound on a single blocking serial read.
pub const DEFAULT_TIMEOUT_MS: u64 = 50;

/// How serial input reaches the render loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReadMode {
    /// Check for buffered input on every tick and only read when some is there.
    #[default]
    Poll,
    /// Read on a dedicated thread and hand headings over through a channel.
    Worker,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Which arrow artwork a snapshot is taken of.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

/// IMU heading visualiser
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Options {
    /// Serial port the sensor is attached to
    #[arg(short = 'p', long = "com", default_value = DEFAULT_PORT)]
    pub port: String,

    /// Serial baud rate
    #[arg(short = 'r', long, default_value_t = DEFAULT_BAUD)]
    pub baudrate: u32,

    #[arg(long, value_enum, default_value_t = ReadMode::Poll)]
    pub mode: ReadMode,

    /// Directory holding arrow_light.png and arrow_dark.png. A generated
    /// arrow is used when omitted.
    #[arg(long)]
    pub assets: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Save the rendered arrow to this PNG whenever the heading changes
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Artwork saved by `--snapshot`
    #[arg(long, value_enum, default_value_t = Theme::Dark)]
    pub theme: Theme,

    /// Render period in milliseconds
    #[arg(long, default_value_t = DEFAULT_TICK_MS)]
    pub tick_ms: u64,

    /// Serial read timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Log level (error, warn, info, debug, trace). `RUST_LOG` wins when set.
    #[arg(short, long)]
    pub verbosity: Option<String>,
}

impl Options {
    #[must_use]
    pub fn serial(&self) -> SerialConfig {
        SerialConfig {
            port: self.port.clone(),
            baud_rate: self.baudrate,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }

    /// The render period, never shorter than one millisecond.
    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

/// Everything needed to open the sensor's serial port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_owned(),
            baud_rate: DEFAULT_BAUD,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}
