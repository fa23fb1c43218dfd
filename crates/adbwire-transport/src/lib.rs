//! Byte channel abstraction for ADB wire protocol clients.
//!
//! The protocol and video layers never open sockets themselves. They read
//! from and write to anything implementing [`Channel`], which is `Read +
//! Write` plus the ability to close the write half while keeping the read
//! half open.
//!
//! [`AdbStream`] wraps an already connected TCP or Unix socket so callers
//! can apply timeouts without caring which kind of socket they hold.

pub mod error;
pub mod traits;

pub use error::{Result, TransportError};
pub use traits::{AdbStream, Channel};
