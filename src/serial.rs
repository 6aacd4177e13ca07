use std::{
    io::{self, Read},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};

use serialport::SerialPort;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, error, info, instrument};

use crate::{
    Error, Heading, Result,
    config::SerialConfig,
    decoder::{HeadingFeed, LineDecoder},
};

/// A byte source that can say how much input is waiting without blocking.
pub trait ByteStream: Read {
    /// Number of bytes that can be read right now.
    fn bytes_available(&mut self) -> io::Result<usize>;
}

impl ByteStream for Box<dyn SerialPort> {
    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.bytes_to_read()? as usize)
    }
}

/// Open the sensor port. 8N1, reads bounded by the configured timeout.
pub fn open(config: &SerialConfig) -> Result<Box<dyn SerialPort>> {
    let port = serialport::new(&config.port, config.baud_rate)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .data_bits(serialport::DataBits::Eight)
        .timeout(config.timeout)
        .open()
        .map_err(|source| Error::Open {
            port: config.port.clone(),
            baud_rate: config.baud_rate,
            source,
        })?;

    info!("Serial port open on {} at {} baud", config.port, config.baud_rate);

    Ok(port)
}

/// Reads the port on its own thread so a quiet device can never hold up
/// rendering. Headings come back over a channel; the newest one wins.
///
/// Dropping the worker stops the thread and closes the port.
pub struct HeadingWorker {
    headings: mpsc::UnboundedReceiver<Result<Heading>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl HeadingWorker {
    pub fn spawn<S>(stream: S) -> Result<Self>
    where
        S: ByteStream + Send + 'static,
    {
        let (send, headings) = mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));

        let handle = thread::Builder::new()
            .name("serial-reader".into())
            .spawn({
                let stop = Arc::clone(&stop);
                move || read_loop(LineDecoder::new(stream), send, &stop)
            })
            .map_err(Error::Spawn)?;

        Ok(Self {
            headings,
            stop,
            handle: Some(handle),
        })
    }
}

impl HeadingFeed for HeadingWorker {
    fn next_heading(&mut self) -> Result<Option<Heading>> {
        let mut latest = None;
        loop {
            match self.headings.try_recv() {
                Ok(Ok(heading)) => latest = Some(heading),
                Ok(Err(e)) => return Err(e),
                Err(TryRecvError::Empty) => return Ok(latest),
                Err(TryRecvError::Disconnected) if latest.is_some() => return Ok(latest),
                Err(TryRecvError::Disconnected) => {
                    return Err(Error::Io(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "serial reader thread exited",
                    )));
                }
            }
        }
    }
}

impl Drop for HeadingWorker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            error!("Serial reader thread panicked");
        }
    }
}

#[instrument(skip_all)]
fn read_loop<S: ByteStream>(
    mut decoder: LineDecoder<S>,
    send: mpsc::UnboundedSender<Result<Heading>>,
    stop: &AtomicBool,
) {
    info!("Initalized serial reader");

    while !stop.load(Ordering::Acquire) {
        match decoder.read_next() {
            Ok(Some(heading)) => {
                if send.send(Ok(heading)).is_err() {
                    break;
                }
            }
            Ok(None) => (),
            Err(e) => {
                error!("Serial read failed: {e}");
                let _ = send.send(Err(e.into()));
                break;
            }
        }
    }

    debug!("Serial reader stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::mpsc as std_mpsc,
        time::{Duration, Instant},
    };

    /// Hands out lines sent from the test, timing out like a real port.
    struct Piped {
        lines: std_mpsc::Receiver<Vec<u8>>,
        current: Vec<u8>,
    }

    impl Read for Piped {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.current.is_empty() {
                match self.lines.recv_timeout(Duration::from_millis(5)) {
                    Ok(bytes) => self.current = bytes,
                    Err(std_mpsc::RecvTimeoutError::Timeout) => {
                        return Err(io::Error::new(io::ErrorKind::TimedOut, "timeout"));
                    }
                    Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                        return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
                    }
                }
            }
            let n = buf.len().min(self.current.len());
            buf[..n].copy_from_slice(&self.current[..n]);
            self.current.drain(..n);
            Ok(n)
        }
    }

    impl ByteStream for Piped {
        fn bytes_available(&mut self) -> io::Result<usize> {
            Ok(self.current.len())
        }
    }

    fn piped() -> (std_mpsc::Sender<Vec<u8>>, Piped) {
        let (send, lines) = std_mpsc::channel();
        (
            send,
            Piped {
                lines,
                current: Vec::new(),
            },
        )
    }

    fn wait_for<F>(worker: &mut HeadingWorker, mut done: F) -> Result<Option<Heading>>
    where
        F: FnMut(&Result<Option<Heading>>) -> bool,
    {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let next = worker.next_heading();
            if done(&next) || Instant::now() > deadline {
                return next;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn worker_delivers_latest_heading() {
        let (device, stream) = piped();
        let mut worker = HeadingWorker::spawn(stream).unwrap();

        assert_eq!(worker.next_heading().unwrap(), None);

        device.send(b"H10\nnoise\nH20\n".to_vec()).unwrap();
        let heading = wait_for(&mut worker, |next| {
            matches!(next, Ok(Some(h)) if *h == Heading::from_degrees(20))
        });
        assert_eq!(heading.unwrap(), Some(Heading::from_degrees(20)));
        assert_eq!(worker.next_heading().unwrap(), None);
    }

    #[test]
    fn worker_surfaces_read_errors() {
        let (device, stream) = piped();
        let mut worker = HeadingWorker::spawn(stream).unwrap();

        drop(device);
        let next = wait_for(&mut worker, |next| next.is_err());
        assert!(matches!(next, Err(Error::Io(ref e)) if e.kind() == io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn dropping_worker_stops_thread() {
        let (device, stream) = piped();
        let worker = HeadingWorker::spawn(stream).unwrap();
        drop(worker);

        // The reader owned the stream; once it is gone the pipe is closed.
        assert!(device.send(b"H1\n".to_vec()).is_err());
    }

    #[test]
    fn missing_port_is_fatal() {
        let config = SerialConfig {
            port: "/dev/this-port-does-not-exist".into(),
            ..SerialConfig::default()
        };
        let err = open(&config).unwrap_err();
        assert!(matches!(err, Error::Open { ref port, .. } if port == &config.port));
    }
}
