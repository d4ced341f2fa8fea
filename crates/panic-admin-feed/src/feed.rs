//! Connection supervisor for the alert push channel.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::backoff::ReconnectPolicy;
use crate::error::{FeedError, Result};
use crate::event::{AlertEvent, DEFAULT_LOG_CAPACITY, EventLog};

pub const DEFAULT_WS_PATH: &str = "/ws/alerts";
/// Events held for `next_event` before new arrivals are dropped from the queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Receives every malformed frame and connection failure.
pub type ErrorCallback = Arc<dyn Fn(&FeedError) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub url: String,
    pub connect_timeout: Duration,
    pub log_capacity: usize,
    pub queue_capacity: usize,
    pub reconnect: ReconnectPolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: format!("ws://localhost:8000{DEFAULT_WS_PATH}"),
            connect_timeout: Duration::from_secs(10),
            log_capacity: DEFAULT_LOG_CAPACITY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl FeedConfig {
    /// Joins a `ws://` or `wss://` base with the channel path.
    #[must_use]
    pub fn new(base_url: &str, path: &str) -> Self {
        let base = base_url.trim().trim_end_matches('/');
        let path = path.trim();
        let url = if path.is_empty() || path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };
        Self {
            url,
            ..Self::default()
        }
    }

    fn parsed_url(&self) -> Result<Url> {
        let parsed = Url::parse(self.url.trim())
            .map_err(|error| FeedError::InvalidUrl(format!("{}: {error}", self.url)))?;
        if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
            return Err(FeedError::InvalidUrl(format!(
                "URL must use ws:// or wss:// scheme, got: {}",
                parsed.scheme()
            )));
        }
        Ok(parsed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Closed,
}

pub struct AlertFeed;

impl AlertFeed {
    /// Starts the connection in the background. Only an invalid URL fails
    /// here; connection problems go to `on_error`.
    pub fn open(config: FeedConfig, on_error: Option<ErrorCallback>) -> Result<FeedHandle> {
        let url = config.parsed_url()?;
        let log = Arc::new(Mutex::new(EventLog::new(config.log_capacity)));
        let (events_tx, events_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (status_tx, status_rx) = watch::channel(FeedStatus::Connecting);

        let supervisor = Supervisor {
            url,
            connect_timeout: config.connect_timeout,
            policy: config.reconnect,
            log: Arc::clone(&log),
            events_tx,
            status_tx,
            on_error,
        };
        let task = tokio::spawn(supervisor.run());

        Ok(FeedHandle {
            log,
            events: events_rx,
            status: status_rx,
            task: Some(task),
        })
    }
}

/// Owner of a live feed. Dropping or closing it ends the connection at once.
pub struct FeedHandle {
    log: Arc<Mutex<EventLog>>,
    events: mpsc::Receiver<AlertEvent>,
    status: watch::Receiver<FeedStatus>,
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    /// Newest-first copy of the bounded log.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AlertEvent> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    /// Next event in arrival order; `None` once the feed has stopped.
    /// The log keeps filling while the queue is full.
    pub async fn next_event(&mut self) -> Option<AlertEvent> {
        self.events.recv().await
    }

    /// Events waiting for `next_event`.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn status(&self) -> FeedStatus {
        *self.status.borrow()
    }

    /// Waits until the status satisfies `predicate` or the feed stops.
    pub async fn wait_for_status(&mut self, predicate: impl Fn(FeedStatus) -> bool) -> FeedStatus {
        match self.status.wait_for(|status| predicate(*status)).await {
            Ok(status) => *status,
            Err(_) => FeedStatus::Closed,
        }
    }

    pub fn close(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("alert feed closed");
        }
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

enum SessionEnd {
    Closed,
    Failed(FeedError),
}

struct Supervisor {
    url: Url,
    connect_timeout: Duration,
    policy: ReconnectPolicy,
    log: Arc<Mutex<EventLog>>,
    events_tx: mpsc::Sender<AlertEvent>,
    status_tx: watch::Sender<FeedStatus>,
    on_error: Option<ErrorCallback>,
}

impl Supervisor {
    async fn run(self) {
        let mut failures: u32 = 0;
        loop {
            match self.connect().await {
                Ok(stream) => {
                    failures = 0;
                    self.status_tx.send_replace(FeedStatus::Connected);
                    info!(url = %self.url, "alert feed connected");
                    match self.pump(stream).await {
                        SessionEnd::Closed => info!(url = %self.url, "alert feed closed by server"),
                        SessionEnd::Failed(error) => self.report(&error),
                    }
                }
                Err(error) => {
                    failures = failures.saturating_add(1);
                    self.report(&error);
                }
            }

            if self.policy.is_exhausted(failures) {
                if self.policy.is_enabled() {
                    self.report(&FeedError::ReconnectExhausted { attempts: failures });
                }
                break;
            }

            let delay = self.policy.delay(failures.saturating_sub(1));
            let attempt = failures.saturating_add(1);
            self.status_tx
                .send_replace(FeedStatus::Reconnecting { attempt });
            debug!(attempt, delay_ms = delay.as_millis() as u64, "alert feed reconnecting");
            sleep(delay).await;
        }
        self.status_tx.send_replace(FeedStatus::Closed);
    }

    async fn connect(&self) -> Result<WsStream> {
        let (stream, _response) = timeout(self.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| FeedError::Timeout(self.connect_timeout.as_millis() as u64))?
            .map_err(|error| FeedError::Connect(error.to_string()))?;
        Ok(stream)
    }

    async fn pump(&self, mut stream: WsStream) -> SessionEnd {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => self.accept(&text),
                Ok(Message::Binary(bytes)) => self.accept(&String::from_utf8_lossy(&bytes)),
                Ok(Message::Close(_)) => return SessionEnd::Closed,
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(error) => return SessionEnd::Failed(FeedError::Read(error.to_string())),
            }
        }
        SessionEnd::Closed
    }

    fn accept(&self, raw: &str) {
        match AlertEvent::parse(raw) {
            Ok(event) => {
                self.log
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .prepend(event.clone());
                if let Err(TrySendError::Full(dropped)) = self.events_tx.try_send(event) {
                    debug!(id = ?dropped.id(), "alert queue full, event kept in log only");
                }
            }
            Err(error) => self.report(&error),
        }
    }

    fn report(&self, error: &FeedError) {
        warn!(url = %self.url, error = %error, "alert feed error");
        if let Some(callback) = &self.on_error {
            callback(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_joins_base_and_path() {
        assert_eq!(
            FeedConfig::new("ws://localhost:8000/", DEFAULT_WS_PATH).url,
            "ws://localhost:8000/ws/alerts"
        );
        assert_eq!(
            FeedConfig::new("wss://feed.example.com", "ws/alerts").url,
            "wss://feed.example.com/ws/alerts"
        );
    }

    #[test]
    fn config_rejects_non_websocket_schemes() {
        let config = FeedConfig::new("http://localhost:8000", DEFAULT_WS_PATH);
        assert!(matches!(config.parsed_url(), Err(FeedError::InvalidUrl(_))));
        assert!(FeedConfig::default().parsed_url().is_ok());
    }
}
