//! Incremental reader for the ADB host/device text protocol.
//!
//! ADB replies are a small grammar layered over an unaligned byte stream:
//! - 4-byte status words (`OKAY`, `FAIL`)
//! - values prefixed by a 4-character ASCII hex length
//! - `\n`-terminated lines (shell output, logcat)
//! - raw byte runs of known length (sync `DATA` chunks)
//! - everything up to end of stream
//!
//! [`FramedReader`] turns whatever slices the transport delivers into these
//! tokens. Command implementations are thin sequences of calls into it.

pub mod codec;
pub mod config;
pub mod error;
pub mod reader;

pub use codec::{
    decode_length, encode_command, encode_data, encode_length, DATA, DENT, DONE, FAIL,
    LENGTH_PREFIX_SIZE, LIST, MAX_VALUE_LENGTH, OKAY, QUIT, RECV, SEND, STAT,
};
pub use config::ReaderConfig;
pub use error::{ProtocolError, Result};
pub use reader::{FramedReader, LineMatch};
