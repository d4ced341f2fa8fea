//! Feed error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("invalid feed URL: {0}")]
    InvalidUrl(String),

    #[error("connection error: {0}")]
    Connect(String),

    #[error("connection timeout after {0} ms")]
    Timeout(u64),

    #[error("WebSocket read error: {0}")]
    Read(String),

    #[error("malformed event: {message}")]
    Malformed { message: String, raw: String },

    #[error("gave up reconnecting after {attempts} consecutive failures")]
    ReconnectExhausted { attempts: u32 },
}

pub type Result<T> = std::result::Result<T, FeedError>;
