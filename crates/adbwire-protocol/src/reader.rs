use std::io::{ErrorKind, Read, Write};

use adbwire_transport::{AdbStream, Channel};
use bytes::{Buf, Bytes, BytesMut};
use regex::Regex;
use tracing::{debug, trace};

use crate::codec::{decode_length, encode_command, encode_data, FAIL, LENGTH_PREFIX_SIZE, OKAY};
use crate::config::ReaderConfig;
use crate::error::{ProtocolError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// A line matched by [`FramedReader::search_line`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMatch {
    /// The full line, carriage return stripped.
    pub line: String,
    /// Capture groups; index 0 is the whole match.
    pub groups: Vec<Option<String>>,
}

impl LineMatch {
    /// Capture group `index`, if it participated in the match.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }
}

/// Reads ADB protocol tokens from a byte channel.
///
/// Every read blocks until it is satisfied, the channel ends, or the channel
/// errors. Reads take `&mut self`, so a reader can only ever have one read in
/// flight. Bytes pulled from the channel but not yet consumed stay in an
/// internal buffer for the next call.
///
/// Fixed-size reads (`read_bytes`, `read_byte_flow`) never pull more than
/// they need from the channel. Line and drain reads may buffer ahead; use
/// [`into_parts`](Self::into_parts) to recover those bytes.
pub struct FramedReader<T> {
    inner: T,
    buf: BytesMut,
    scratch: Box<[u8]>,
    ended: bool,
    last_message: String,
    config: ReaderConfig,
}

impl<T: Read> FramedReader<T> {
    /// Create a new reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, ReaderConfig::default())
    }

    /// Create a new reader with explicit configuration.
    pub fn with_config(inner: T, config: ReaderConfig) -> Self {
        let chunk = config.read_chunk_size.max(1);
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            scratch: vec![0u8; chunk].into_boxed_slice(),
            ended: false,
            last_message: String::new(),
            config,
        }
    }

    /// Read exactly `n` bytes.
    ///
    /// Fails with `PrematureEof` carrying the shortfall if the channel ends
    /// first. `n == 0` returns immediately without touching the channel.
    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        if n == 0 {
            return Ok(Bytes::new());
        }
        while self.buf.len() < n {
            let wanted = n - self.buf.len();
            if self.fill(wanted)? == 0 {
                return Err(self.premature_eof(wanted));
            }
        }
        Ok(self.buf.split_to(n).freeze())
    }

    /// Read exactly `n` bytes and decode them as ASCII text.
    ///
    /// Never fails on content: the high bit of each byte is dropped.
    pub fn read_ascii(&mut self, n: usize) -> Result<String> {
        let bytes = self.read_bytes(n)?;
        let text: String = bytes.iter().map(|b| char::from(b & 0x7f)).collect();
        self.last_message.clone_from(&text);
        Ok(text)
    }

    /// Read a value: a 4-character hex length followed by that many bytes.
    pub fn read_value(&mut self) -> Result<Bytes> {
        let prefix = self.read_bytes(LENGTH_PREFIX_SIZE)?;
        let length = decode_length(&prefix)?;
        self.read_bytes(length)
    }

    /// Read up to (not including) `delimiter`, consuming the delimiter.
    pub fn read_until(&mut self, delimiter: u8) -> Result<Bytes> {
        let mut scanned = 0;
        loop {
            if let Some(pos) = self.buf[scanned..].iter().position(|b| *b == delimiter) {
                let found = self.buf.split_to(scanned + pos).freeze();
                self.buf.advance(1);
                return Ok(found);
            }
            scanned = self.buf.len();

            let chunk = self.scratch.len();
            if self.fill(chunk)? == 0 {
                return Err(self.premature_eof(1));
            }
        }
    }

    /// Read one `\n`-terminated line, stripping a trailing `\r`.
    pub fn read_line(&mut self) -> Result<Bytes> {
        let mut line = self.read_until(b'\n')?;
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        Ok(line)
    }

    /// Read lines until one matches `pattern`.
    ///
    /// There is no retry bound: this only returns an error once the channel
    /// ends or fails. Callers that cannot guarantee the pattern appears must
    /// impose their own timeout and drop the channel on expiry.
    pub fn search_line(&mut self, pattern: &Regex) -> Result<LineMatch> {
        loop {
            let raw = self.read_line()?;
            let line = String::from_utf8_lossy(&raw);
            if let Some(captures) = pattern.captures(&line) {
                let groups = captures
                    .iter()
                    .map(|group| group.map(|m| m.as_str().to_string()))
                    .collect();
                return Ok(LineMatch {
                    line: line.into_owned(),
                    groups,
                });
            }
            trace!(line = %line, "line did not match");
        }
    }

    /// Copy exactly `n` bytes from the channel into `sink`.
    ///
    /// Bytes are forwarded chunk by chunk as they arrive; at most one chunk
    /// is held in memory at a time.
    pub fn read_byte_flow<W: Write>(&mut self, n: usize, sink: &mut W) -> Result<()> {
        let mut remaining = n;

        if remaining > 0 && !self.buf.is_empty() {
            let take = remaining.min(self.buf.len());
            sink.write_all(&self.buf[..take])?;
            self.buf.advance(take);
            remaining -= take;
        }

        while remaining > 0 {
            let limit = remaining.min(self.scratch.len());
            let read = self.read_channel(limit)?;
            if read == 0 {
                return Err(self.premature_eof(remaining));
            }
            sink.write_all(&self.scratch[..read])?;
            remaining -= read;
        }

        Ok(())
    }

    /// Drain the channel until it ends and return every remaining byte.
    ///
    /// End of stream is the success condition here; channel errors still
    /// propagate.
    pub fn read_all(&mut self) -> Result<Bytes> {
        loop {
            let chunk = self.scratch.len();
            if self.fill(chunk)? == 0 {
                return Ok(self.buf.split().freeze());
            }
        }
    }

    /// Read the error value that follows a `FAIL` status.
    ///
    /// Returns the error to raise: `Fail` with the decoded message. A
    /// protocol error hit while reading the message is returned unchanged;
    /// a channel error becomes `Fail` with message `unknown Error`.
    pub fn read_error(&mut self) -> ProtocolError {
        match self.read_value() {
            Ok(value) => {
                let message = String::from_utf8_lossy(&value).into_owned();
                debug!(%message, last_message = %self.last_message, "peer reported failure");
                ProtocolError::Fail {
                    message,
                    last_message: self.last_message.clone(),
                }
            }
            Err(ProtocolError::Io(err)) => {
                debug!(
                    %err,
                    last_message = %self.last_message,
                    "channel failed reading error value"
                );
                ProtocolError::Fail {
                    message: "unknown Error".to_string(),
                    last_message: self.last_message.clone(),
                }
            }
            Err(err) => err,
        }
    }

    /// Read a 4-byte reply status and require `OKAY`.
    ///
    /// `FAIL` is turned into the error returned by [`read_error`](Self::read_error).
    pub fn read_status(&mut self) -> Result<()> {
        let status = self.read_bytes(4)?;
        if status[..] == OKAY {
            Ok(())
        } else if status[..] == FAIL {
            Err(self.read_error())
        } else {
            Err(self.unexpected(&String::from_utf8_lossy(&status), "OKAY or FAIL"))
        }
    }

    /// Build the error for a token the caller did not expect.
    pub fn unexpected(&self, data: &str, expected: &str) -> ProtocolError {
        ProtocolError::UnexpectedData {
            unexpected: data.to_string(),
            expected: expected.to_string(),
            last_message: self.last_message.clone(),
        }
    }

    /// Whether end of stream has been observed.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// The most recent command sent or ASCII token read.
    pub fn last_message(&self) -> &str {
        &self.last_message
    }

    /// Override the context attached to subsequent errors.
    pub fn set_last_message(&mut self, message: impl Into<String>) {
        self.last_message = message.into();
    }

    /// Bytes pulled from the channel but not yet consumed.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    ///
    /// Reading from it directly skips anything still buffered here.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner channel.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Consume the reader, returning the channel and any buffered bytes.
    pub fn into_parts(self) -> (T, Bytes) {
        (self.inner, self.buf.freeze())
    }

    /// Current reader configuration.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    fn premature_eof(&self, missing: usize) -> ProtocolError {
        ProtocolError::PrematureEof {
            missing,
            last_message: self.last_message.clone(),
        }
    }

    /// Append up to `limit` bytes from the channel to the buffer.
    fn fill(&mut self, limit: usize) -> Result<usize> {
        let limit = limit.min(self.scratch.len());
        let read = self.read_channel(limit)?;
        self.buf.extend_from_slice(&self.scratch[..read]);
        Ok(read)
    }

    /// Read up to `limit` bytes into the scratch chunk. Returns 0 once the
    /// channel has ended, on this call or an earlier one.
    fn read_channel(&mut self, limit: usize) -> Result<usize> {
        if self.ended {
            return Ok(0);
        }
        loop {
            match self.inner.read(&mut self.scratch[..limit]) {
                Ok(0) => {
                    debug!(buffered = self.buf.len(), "channel ended");
                    self.ended = true;
                    return Ok(0);
                }
                Ok(n) => {
                    trace!(bytes = n, "channel read");
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ProtocolError::Io(err)),
            }
        }
    }
}

impl<T: Read + Write> FramedReader<T> {
    /// Send a host request: `text` wrapped in a 4-character hex length.
    ///
    /// `text` becomes the reader's `last_message`.
    pub fn send_command(&mut self, text: &str) -> Result<()> {
        let mut request = BytesMut::new();
        encode_data(&encode_command(text), &mut request)?;

        self.inner.write_all(&request)?;
        self.inner.flush()?;

        debug!(command = text, "sent command");
        self.last_message = text.to_string();
        Ok(())
    }
}

impl<T: Channel> FramedReader<T> {
    /// Close the write half, then drain and discard input until it ends.
    ///
    /// A no-op once the channel has ended.
    pub fn end(&mut self) -> Result<()> {
        if self.ended {
            return Ok(());
        }

        self.inner.shutdown_write()?;
        let mut discarded = self.buf.len();
        self.buf.clear();
        loop {
            let chunk = self.scratch.len();
            let read = self.read_channel(chunk)?;
            if read == 0 {
                break;
            }
            discarded += read;
        }

        debug!(discarded, "reader ended");
        Ok(())
    }
}

impl FramedReader<AdbStream> {
    /// Create a reader over an `AdbStream`, applying timeouts from config.
    pub fn with_config_stream(inner: AdbStream, config: ReaderConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_protocol_error)?;
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_protocol_error)?;
        Ok(Self::with_config(inner, config))
    }
}

fn transport_to_protocol_error(err: adbwire_transport::TransportError) -> ProtocolError {
    match err {
        adbwire_transport::TransportError::Io(io) => ProtocolError::Io(io),
        other => ProtocolError::Io(std::io::Error::other(other.to_string())),
    }
}

impl<T> std::fmt::Debug for FramedReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramedReader")
            .field("buffered", &self.buf.len())
            .field("ended", &self.ended)
            .field("last_message", &self.last_message)
            .finish()
    }
}
