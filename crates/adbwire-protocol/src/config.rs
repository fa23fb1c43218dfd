use std::time::Duration;

/// Default number of bytes requested from the channel per read call.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

/// Configuration for a [`FramedReader`](crate::FramedReader).
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Upper bound on a single read from the channel. Default: 8 KiB.
    pub read_chunk_size: usize,
    /// Read timeout applied to socket-backed channels.
    pub read_timeout: Option<Duration>,
    /// Write timeout applied to socket-backed channels.
    pub write_timeout: Option<Duration>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
