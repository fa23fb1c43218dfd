//! The minicap screen capture stream.
//!
//! Wire format: one banner
//! ```text
//! ┌─────────┬────────┬─────────┬──────────┬──────────┬──────────┬──────────┬──────┬───────┐
//! │ Version │ Length │ PID     │ Real W   │ Real H   │ Virt W   │ Virt H   │ Ori. │ Flags │
//! │ (1B)    │ (1B)   │ (4B LE) │ (4B LE)  │ (4B LE)  │ (4B LE)  │ (4B LE)  │ (1B) │ (1B)  │
//! └─────────┴────────┴─────────┴──────────┴──────────┴──────────┴──────────┴──────┴───────┘
//! ```
//! followed by frames, each a 4-byte little-endian length and a JPEG body.

pub mod codec;
pub mod demuxer;
pub mod header;
pub mod projection;
#[cfg(feature = "async")]
pub mod stream;

pub use codec::{decode_frame, encode_frame, DEFAULT_MAX_FRAME_SIZE, FRAME_LENGTH_SIZE, JPEG_SOI};
#[cfg(feature = "async")]
pub use codec::{MinicapCodec, MinicapEvent};
pub use demuxer::{DemuxConfig, FrameDemuxer};
pub use header::{decode_header, FrameHeader, HEADER_SIZE};
pub use projection::ProjectionSpec;
#[cfg(feature = "async")]
pub use stream::{spawn_stream, HeaderSignal, MinicapStream};
