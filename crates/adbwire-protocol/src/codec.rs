use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ProtocolError, Result};

/// Reply status: request accepted.
pub const OKAY: [u8; 4] = *b"OKAY";
/// Reply status: request rejected, an error value follows.
pub const FAIL: [u8; 4] = *b"FAIL";

/// Sync sub-protocol request and reply ids.
pub const STAT: [u8; 4] = *b"STAT";
pub const LIST: [u8; 4] = *b"LIST";
pub const DENT: [u8; 4] = *b"DENT";
pub const RECV: [u8; 4] = *b"RECV";
pub const DATA: [u8; 4] = *b"DATA";
pub const DONE: [u8; 4] = *b"DONE";
pub const SEND: [u8; 4] = *b"SEND";
pub const QUIT: [u8; 4] = *b"QUIT";

/// Size of the ASCII hex length prefix in front of every value.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest length a 4-digit hex prefix can declare.
pub const MAX_VALUE_LENGTH: usize = 0xFFFF;

/// Encode a command string as the literal bytes to send.
///
/// No framing is added; see [`encode_data`] for the length-prefixed host
/// request envelope.
pub fn encode_command(text: &str) -> Bytes {
    Bytes::copy_from_slice(text.as_bytes())
}

/// Decode a 4-character ASCII hex length prefix.
///
/// Digits are in big-endian order, so `b"001a"` decodes to 26. Both cases of
/// `a-f` are accepted.
pub fn decode_length(prefix: &[u8]) -> Result<usize> {
    if prefix.len() != LENGTH_PREFIX_SIZE {
        return Err(ProtocolError::Decode(format!(
            "length prefix must be {LENGTH_PREFIX_SIZE} bytes, got {}",
            prefix.len()
        )));
    }

    prefix.iter().try_fold(0usize, |acc, &byte| {
        let digit = (byte as char).to_digit(16).ok_or_else(|| {
            ProtocolError::Decode(format!(
                "invalid hex length prefix {:?}",
                String::from_utf8_lossy(prefix)
            ))
        })?;
        Ok(acc << 4 | digit as usize)
    })
}

/// Encode a length as a 4-character lowercase ASCII hex prefix.
pub fn encode_length(len: usize) -> Result<[u8; LENGTH_PREFIX_SIZE]> {
    if len > MAX_VALUE_LENGTH {
        return Err(ProtocolError::Decode(format!(
            "value too long for hex prefix ({len} bytes, max {MAX_VALUE_LENGTH})"
        )));
    }

    let mut out = [0u8; LENGTH_PREFIX_SIZE];
    out.copy_from_slice(format!("{len:04x}").as_bytes());
    Ok(out)
}

/// Encode a payload as a length-prefixed value.
///
/// Wire format:
/// ```text
/// ┌──────────────────────┬────────────────┐
/// │ Length (4 hex ASCII) │ Payload        │
/// │ e.g. "000c"          │ "host:version" │
/// └──────────────────────┴────────────────┘
/// ```
pub fn encode_data(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let prefix = encode_length(payload.len())?;
    dst.reserve(LENGTH_PREFIX_SIZE + payload.len());
    dst.put_slice(&prefix);
    dst.put_slice(payload);
    Ok(())
}
