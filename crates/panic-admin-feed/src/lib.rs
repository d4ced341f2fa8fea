//! Realtime alert feed: one WebSocket connection feeding a bounded,
//! newest-first event log.

pub mod backoff;
pub mod error;
pub mod event;
pub mod feed;

pub use backoff::ReconnectPolicy;
pub use error::{FeedError, Result};
pub use event::{AlertEvent, DEFAULT_LOG_CAPACITY, EventLog};
pub use feed::{
    AlertFeed, DEFAULT_QUEUE_CAPACITY, DEFAULT_WS_PATH, ErrorCallback, FeedConfig, FeedHandle,
    FeedStatus,
};
