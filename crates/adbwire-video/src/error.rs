/// Errors raised by the video stream parsers.
#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    /// The source ended while `missing` more bytes were still required.
    #[error("premature end of stream, needed {missing} more bytes")]
    PrematureEof { missing: usize },

    /// A fixed binary header was malformed.
    #[error("decode error: {0}")]
    Decode(String),

    /// A frame body did not start with the JPEG start-of-image marker.
    #[error("stream corruption: frame starts with {found:02x?}, expected ff d8")]
    StreamCorruption { found: Vec<u8> },

    /// A frame length prefix exceeds the configured maximum.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Only 24 and 32 bits per pixel with 8-bit channels are supported.
    #[error("unsupported pixel format: {bits_per_pixel} bits per pixel")]
    UnsupportedPixelFormat { bits_per_pixel: u32 },

    /// A channel offset points outside the pixel.
    #[error("{channel} offset {offset} is outside a {pixel_bytes}-byte pixel")]
    InvalidChannelOffset {
        channel: &'static str,
        offset: usize,
        pixel_bytes: usize,
    },

    /// An I/O error occurred on the byte source.
    #[error("video I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The demuxer has stopped and yields nothing further.
    #[error("stream stopped")]
    Stopped,
}

pub type Result<T> = std::result::Result<T, VideoError>;
