//! Heading line protocol.
//!
//! The sensor sends one record per line: `H` followed by one to three
//! decimal digits, e.g. `H270\n`. Records are at most four characters long
//! once surrounding whitespace (including a `\r` before the `\n`) is trimmed.
//! Everything else on the wire is noise and is dropped without complaint.

use std::io::{self, ErrorKind, Read};

use tracing::{debug, trace, warn};

use crate::{Heading, Result, serial::ByteStream};

/// Marks a heading record.
pub const HEADING_MARKER: char = 'H';

/// Longest trimmed line that can still be a heading record.
pub const MAX_RECORD_LEN: usize = 4;

/// Bytes kept without seeing a line terminator before they are thrown away.
pub const MAX_PENDING_BYTES: usize = 256;

const READ_CHUNK: usize = 64;

/// Parse one line of text as a heading record.
#[must_use]
pub fn parse_heading_line(line: &str) -> Option<Heading> {
    let line = line.trim();
    if line.is_empty() || line.len() > MAX_RECORD_LEN {
        return None;
    }

    let digits = line.strip_prefix(HEADING_MARKER)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok().map(Heading::from_degrees)
}

/// Parse a raw line off the wire. Bytes that are not valid UTF-8 never form
/// a record.
#[must_use]
pub fn parse_heading_bytes(line: &[u8]) -> Option<Heading> {
    std::str::from_utf8(line).ok().and_then(parse_heading_line)
}

/// Something that can hand the render loop the latest heading without
/// blocking it.
pub trait HeadingFeed {
    /// The newest heading decoded since the last call, if any.
    fn next_heading(&mut self) -> Result<Option<Heading>>;
}

impl<F: HeadingFeed + ?Sized> HeadingFeed for Box<F> {
    fn next_heading(&mut self) -> Result<Option<Heading>> {
        (**self).next_heading()
    }
}

/// Splits a byte stream into lines and decodes heading records from them.
///
/// Bytes of a line that has not been terminated yet are held until the rest
/// of it arrives. A line that outgrows [`MAX_PENDING_BYTES`] is dropped as a
/// whole, up to and including its terminator.
pub struct LineDecoder<S> {
    stream: S,
    pending: Vec<u8>,
    discarding: bool,
}

impl<S: ByteStream> LineDecoder<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            pending: Vec::with_capacity(READ_CHUNK),
            discarding: false,
        }
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Decode every complete line the stream already has buffered and return
    /// the last heading among them. Returns `Ok(None)` straight away when
    /// nothing is waiting, and also when no buffered line is a heading record.
    pub fn decode_next(&mut self) -> io::Result<Option<Heading>> {
        let mut remaining = self.stream.bytes_available()?;
        while remaining > 0 {
            let read = self.fill(remaining)?;
            if read == 0 {
                break;
            }
            remaining = remaining.saturating_sub(read);
        }

        let mut latest = None;
        while let Some(line) = self.take_line() {
            if let Some(heading) = decode_line(&line) {
                latest = Some(heading);
            }
        }
        Ok(latest)
    }

    /// Decode at most one line, waiting on the stream for up to its read
    /// timeout. Only meant for a dedicated reader thread.
    pub fn read_next(&mut self) -> io::Result<Option<Heading>> {
        if let Some(line) = self.take_line() {
            return Ok(decode_line(&line));
        }

        self.fill(READ_CHUNK)?;
        Ok(self.take_line().and_then(|line| decode_line(&line)))
    }

    /// Read up to `max` bytes into the pending buffer, returning how many
    /// came off the stream.
    fn fill(&mut self, max: usize) -> io::Result<usize> {
        let mut buf = [0u8; READ_CHUNK];
        let max = max.min(READ_CHUNK);

        let read = match self.stream.read(&mut buf[..max]) {
            Ok(n) => n,
            Err(e) if is_idle(&e) => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut bytes = &buf[..read];
        if self.discarding {
            match bytes.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    self.discarding = false;
                    bytes = &bytes[end + 1..];
                }
                None => bytes = &[],
            }
        }
        self.pending.extend_from_slice(bytes);

        // A run this long without a terminator cannot be a record. Drop it
        // and everything else up to its terminator.
        let tail = self
            .pending
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        if self.pending.len() - tail > MAX_PENDING_BYTES {
            warn!("Discarding a line longer than {MAX_PENDING_BYTES} bytes");
            self.pending.truncate(tail);
            self.discarding = true;
        }

        Ok(read)
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.pending.drain(..=end).collect();
        line.pop();
        Some(line)
    }
}

impl<S: ByteStream> HeadingFeed for LineDecoder<S> {
    fn next_heading(&mut self) -> Result<Option<Heading>> {
        Ok(self.decode_next()?)
    }
}

fn decode_line(line: &[u8]) -> Option<Heading> {
    let heading = parse_heading_bytes(line);

    match heading {
        Some(heading) => trace!("Heading {heading}"),
        None => {
            let text = String::from_utf8_lossy(line);
            if !text.trim().is_empty() {
                debug!("Ignoring line {:?}", text.trim());
            }
        }
    }

    heading
}

/// Errors that only mean "no data right now".
fn is_idle(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
    )
}
