//! Fixed-interval polling scheduler.
//!
//! Every tick issues one `read_latest` per polled channel as its own
//! spawned task, so a slow channel never delays the others and a slow tick
//! never delays the next one. Outstanding reads are deliberately not
//! de-duplicated: under a slow broker, reads from tick N may land after
//! tick N+1 started, and results are applied in arrival order
//! (last-arrival-wins per channel).

use super::reconciler::Reconciler;
use crate::config::FeedChannels;
use crate::feed::{Channel, FeedStore};
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub struct Poller {
    feed: Arc<dyn FeedStore>,
    channels: FeedChannels,
    reconciler: Reconciler,
    period: Duration,
}

impl Poller {
    pub fn new(
        feed: Arc<dyn FeedStore>,
        channels: FeedChannels,
        reconciler: Reconciler,
        period: Duration,
    ) -> Self {
        Self {
            feed,
            channels,
            reconciler,
            period,
        }
    }

    /// Start polling. The scheduler and every read it issues stop at
    /// cancellation; the first tick fires immediately so the panel leaves
    /// its loading state as soon as the feed answers.
    pub fn spawn(self, tracker: TaskTracker, token: CancellationToken) {
        let read_tracker = tracker.clone();
        tracker.spawn(async move { self.run(read_tracker, token).await });
    }

    async fn run(self, tracker: TaskTracker, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.period);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            for channel in Channel::polled() {
                let feed = self.feed.clone();
                let key = self.channels.key(channel).to_string();
                let reconciler = self.reconciler.clone();
                let token = token.clone();

                tracker.spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => {}
                        result = feed.read_latest(&key) => match result {
                            Ok(payload) => reconciler.apply(channel, payload),
                            Err(e) => debug!("[Poll] read of {} ({}) failed: {}", channel, key, e),
                        }
                    }
                });
            }
        }
        debug!("[Poll] scheduler stopped");
    }
}
