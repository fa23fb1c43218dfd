//! Client-side plumbing for the Android Debug Bridge wire protocol.
//!
//! adbwire parses what an ADB server and on-device helpers send back: status
//! words, length-prefixed values, text lines, raw framebuffer dumps and the
//! minicap JPEG stream.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte channels with a closable write half (TCP, UDS)
//! - [`protocol`]: the incremental protocol reader and length-prefix codec
//! - [`video`]: framebuffer pixel normalization and minicap demultiplexing

/// Re-export transport types.
pub mod transport {
    pub use adbwire_transport::*;
}

/// Re-export protocol types.
pub mod protocol {
    pub use adbwire_protocol::*;
}

/// Re-export video types. The tokio stream API requires the `async` feature.
pub mod video {
    pub use adbwire_video::*;
}
