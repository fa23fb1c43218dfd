//! Binary video streams layered on ADB channels.
//!
//! - [`pixel`] normalizes raw framebuffer pixel data (24 or 32 bits per
//!   pixel, arbitrary channel order) into packed RGB, across chunk
//!   boundaries.
//! - [`framebuffer`] parses the header that precedes a raw framebuffer dump.
//! - [`minicap`] demultiplexes the minicap stream: one binary banner, then
//!   an endless sequence of length-prefixed JPEG frames.
//!
//! None of this opens sockets or spawns device processes. Callers hand in a
//! byte source and get parsed output back.

pub mod error;
pub mod framebuffer;
pub mod minicap;
pub mod pixel;

pub use error::{Result, VideoError};
pub use framebuffer::{FramebufferMeta, PixelFormat, FRAMEBUFFER_HEADER_SIZE};
pub use minicap::{
    decode_frame, decode_header, DemuxConfig, FrameDemuxer, FrameHeader, ProjectionSpec,
    DEFAULT_MAX_FRAME_SIZE, HEADER_SIZE, JPEG_SOI,
};
#[cfg(feature = "async")]
pub use minicap::{spawn_stream, HeaderSignal, MinicapCodec, MinicapEvent, MinicapStream};
pub use pixel::{PixelLayout, PixelNormalizer, Pixels, RgbWriter};
