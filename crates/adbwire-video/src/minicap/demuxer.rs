use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::error::{Result, VideoError};
use crate::minicap::codec::{decode_frame, frame_bytes_needed, DEFAULT_MAX_FRAME_SIZE};
use crate::minicap::header::{decode_header, header_bytes_needed, FrameHeader};

const INITIAL_BUFFER_CAPACITY: usize = 64 * 1024;

/// Default number of bytes requested from the source per read call.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

/// Default depth of the frame queue used by `spawn_stream`.
pub const DEFAULT_FRAME_QUEUE_DEPTH: usize = 8;

/// Configuration for the minicap demuxer.
#[derive(Debug, Clone)]
pub struct DemuxConfig {
    /// Largest frame accepted. Default: 16 MiB.
    pub max_frame_size: usize,
    /// Upper bound on a single read from the source. Default: 8 KiB.
    pub read_chunk_size: usize,
    /// Frames buffered between the stream task and its consumer (async
    /// only). Default: 8.
    pub frame_queue_depth: usize,
}

impl Default for DemuxConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            frame_queue_depth: DEFAULT_FRAME_QUEUE_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Streaming,
    Stopped,
}

/// Splits a minicap byte source into its banner and JPEG frames.
///
/// The banner is parsed once, on the first call to [`header`](Self::header)
/// or [`next_frame`](Self::next_frame), and cached. Frames follow until the
/// source ends or a frame fails the JPEG marker check; either way the demuxer
/// then stops for good.
pub struct FrameDemuxer<R> {
    inner: R,
    buf: BytesMut,
    scratch: Box<[u8]>,
    header: Option<FrameHeader>,
    state: State,
    config: DemuxConfig,
}

impl<R: Read> FrameDemuxer<R> {
    /// Create a demuxer with default configuration.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, DemuxConfig::default())
    }

    /// Create a demuxer with explicit configuration.
    pub fn with_config(inner: R, config: DemuxConfig) -> Self {
        let chunk = config.read_chunk_size.max(1);
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            scratch: vec![0u8; chunk].into_boxed_slice(),
            header: None,
            state: State::Header,
            config,
        }
    }

    /// The stream banner, reading it first if needed.
    ///
    /// Failing to read the banner stops the demuxer.
    pub fn header(&mut self) -> Result<FrameHeader> {
        if let Some(header) = self.header {
            return Ok(header);
        }
        if self.state == State::Stopped {
            return Err(VideoError::Stopped);
        }

        loop {
            match decode_header(&mut self.buf) {
                Ok(Some(header)) => {
                    debug!(
                        version = header.version,
                        pid = header.pid,
                        real_width = header.real_width,
                        real_height = header.real_height,
                        virtual_width = header.virtual_width,
                        virtual_height = header.virtual_height,
                        orientation = header.orientation,
                        bitflags = header.bitflags,
                        "minicap banner"
                    );
                    self.header = Some(header);
                    self.state = State::Streaming;
                    return Ok(header);
                }
                Ok(None) => self.fill(header_bytes_needed)?,
                Err(err) => return Err(self.stop(err)),
            }
        }
    }

    /// The banner if it has already been parsed.
    pub fn cached_header(&self) -> Option<FrameHeader> {
        self.header
    }

    /// Read the next complete JPEG frame.
    ///
    /// Returns `Ok(None)` when the source ends cleanly between frames.
    /// Returns `StreamCorruption` (once) when a frame lacks the JPEG marker;
    /// every later call returns `Stopped`.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        match self.state {
            State::Stopped => return Err(VideoError::Stopped),
            State::Header => {
                self.header()?;
            }
            State::Streaming => {}
        }

        loop {
            match decode_frame(&mut self.buf, self.config.max_frame_size) {
                Ok(Some(frame)) => {
                    trace!(len = frame.len(), "minicap frame");
                    return Ok(Some(frame));
                }
                Ok(None) if self.buf.is_empty() => {
                    if self.read_more()? == 0 {
                        debug!("minicap source ended");
                        self.state = State::Stopped;
                        return Ok(None);
                    }
                }
                Ok(None) => self.fill(frame_bytes_needed)?,
                Err(err) => {
                    if matches!(err, VideoError::StreamCorruption { .. }) {
                        warn!(%err, "minicap stream corrupted, stopping");
                    }
                    return Err(self.stop(err));
                }
            }
        }
    }

    /// Whether the demuxer has stopped.
    pub fn is_stopped(&self) -> bool {
        self.state == State::Stopped
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the demuxer and return the source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Current demuxer configuration.
    pub fn config(&self) -> &DemuxConfig {
        &self.config
    }

    fn stop(&mut self, err: VideoError) -> VideoError {
        self.state = State::Stopped;
        self.buf.clear();
        err
    }

    /// Read at least one more byte; hitting end of input is `PrematureEof`
    /// for however many bytes `needed` says are still outstanding.
    fn fill(&mut self, needed: fn(&[u8]) -> usize) -> Result<()> {
        if self.read_more()? == 0 {
            let missing = needed(&self.buf).saturating_sub(self.buf.len());
            return Err(self.stop(VideoError::PrematureEof { missing }));
        }
        Ok(())
    }

    fn read_more(&mut self) -> Result<usize> {
        loop {
            match self.inner.read(&mut self.scratch) {
                Ok(n) => {
                    self.buf.extend_from_slice(&self.scratch[..n]);
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(self.stop(VideoError::Io(err))),
            }
        }
    }
}

impl<R: Read> Iterator for FrameDemuxer<R> {
    type Item = Result<Bytes>;

    /// Yields frames until the source ends; a corruption or read error is
    /// yielded once, then iteration ends.
    fn next(&mut self) -> Option<Self::Item> {
        match self.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) | Err(VideoError::Stopped) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

impl<R> std::fmt::Debug for FrameDemuxer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDemuxer")
            .field("state", &self.state)
            .field("header", &self.header)
            .field("buffered", &self.buf.len())
            .finish()
    }
}
