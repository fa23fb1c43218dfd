/// Errors raised while reading ADB protocol replies.
///
/// `last_message` carries the most recent command or ASCII token seen on the
/// reader, to give a failure some context.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The peer answered `FAIL` followed by an error value.
    #[error("failure: '{message}' (last message: {last_message})")]
    Fail {
        message: String,
        last_message: String,
    },

    /// The stream ended while `missing` more bytes were still required.
    #[error("premature end of stream, needed {missing} more bytes (last message: {last_message})")]
    PrematureEof {
        missing: usize,
        last_message: String,
    },

    /// A token did not match what the caller expected.
    #[error("unexpected '{unexpected}', was expecting {expected} (last message: {last_message})")]
    UnexpectedData {
        unexpected: String,
        expected: String,
        last_message: String,
    },

    /// A length prefix or ASCII token was malformed.
    #[error("decode error: {0}")]
    Decode(String),

    /// The channel reported an I/O error.
    #[error("protocol I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Number of bytes the stream fell short by, for `PrematureEof`.
    pub fn missing_bytes(&self) -> Option<usize> {
        match self {
            ProtocolError::PrematureEof { missing, .. } => Some(*missing),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
