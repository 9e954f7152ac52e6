use std::fmt;
use thiserror::Error;

/// The decoding stage at which an opaque token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFault {
    /// No token, or an empty one.
    Missing,
    /// Not valid URL-safe base64.
    Encoding,
    /// Not a deflate stream, or inflates past the configured bound.
    Compression,
    /// Inflated bytes are not a JSON document.
    Structure,
}

impl fmt::Display for TokenFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Missing => "missing",
            Self::Encoding => "encoding",
            Self::Compression => "compression",
            Self::Structure => "structure",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum PageError {
    #[error("malformed token ({fault}): {message}")]
    MalformedToken { fault: TokenFault, message: String },

    #[error("un-parsable paginator cursor: {0}")]
    CursorParse(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid sort: {0}")]
    InvalidSort(String),

    #[error("Paginator does not represent a snapshot: {0}")]
    SnapshotState(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl PageError {
    pub(crate) fn malformed(fault: TokenFault, message: impl Into<String>) -> Self {
        Self::MalformedToken { fault, message: message.into() }
    }

    /// The token decoding stage that failed, if this is a malformed-token error.
    #[must_use]
    pub const fn token_fault(&self) -> Option<TokenFault> {
        match self {
            Self::MalformedToken { fault, .. } => Some(*fault),
            _ => None,
        }
    }
}
