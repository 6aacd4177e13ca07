use std::{io, path::PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The serial device could not be opened. Fatal at startup, never retried.
    #[error("could not open serial port {port} at {baud_rate} baud: {source}")]
    Open {
        port: String,
        baud_rate: u32,
        #[source]
        source: serialport::Error,
    },

    #[error("serial read failed: {0}")]
    Io(#[from] io::Error),

    #[error("could not start the serial reader thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("could not load arrow asset {}: {source}", path.display())]
    Asset {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("display update failed: {0}")]
    Display(#[source] io::Error),

    #[error("could not write snapshot {}: {source}", path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("could not encode frame summary: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_failure_is_not_reported_as_a_read() {
        let err = Error::Spawn(io::Error::new(io::ErrorKind::OutOfMemory, "no threads left"));
        assert_eq!(
            err.to_string(),
            "could not start the serial reader thread: no threads left"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
