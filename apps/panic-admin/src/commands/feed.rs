use std::sync::Arc;

use anyhow::{Context, Result};
use panic_admin_core::Gate;
use panic_admin_feed::{AlertFeed, ErrorCallback, FeedError};
use tracing::info;

use super::Console;

impl Console {
    /// Prints alerts as they arrive until interrupted, `count` is reached,
    /// or the feed gives up reconnecting.
    pub async fn feed(&self, count: Option<usize>) -> Result<()> {
        self.admit(Gate::Authenticated, "/dashboard")?;

        let config = self.config.feed_config();
        info!(url = %config.url, "opening alert feed");
        let on_error: ErrorCallback = Arc::new(|error: &FeedError| eprintln!("feed: {error}"));
        let mut handle = AlertFeed::open(config, Some(on_error)).context("failed to open alert feed")?;

        let mut seen = 0_usize;
        loop {
            if count.is_some_and(|limit| seen >= limit) {
                break;
            }
            tokio::select! {
                event = handle.next_event() => {
                    let Some(event) = event else {
                        break;
                    };
                    seen += 1;
                    println!("{}", event.summary());
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }
        info!(received = seen, "alert feed stopped");
        handle.close();
        Ok(())
    }
}
