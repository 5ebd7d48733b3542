//! Debounced command writer for the sensitivity channel.
//!
//! A slider drag produces a burst of edits; the writer shows every edit
//! locally at once but holds the remote write until the burst has been
//! quiet for the configured window, then publishes the last value exactly
//! once. Each new edit supersedes the pending one; teardown discards it.

use super::state::PanelState;
use crate::feed::{self, FeedStore};
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub struct DebouncedWriter {
    feed: Arc<dyn FeedStore>,
    state: Arc<PanelState>,
    /// Topic key of the sensor channel.
    topic: String,
    quiet: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
    tracker: TaskTracker,
    token: CancellationToken,
}

impl DebouncedWriter {
    pub fn new(
        feed: Arc<dyn FeedStore>,
        state: Arc<PanelState>,
        topic: String,
        quiet: Duration,
        tracker: TaskTracker,
        token: CancellationToken,
    ) -> Self {
        Self {
            feed,
            state,
            topic,
            quiet,
            pending: Mutex::new(None),
            tracker,
            token,
        }
    }

    /// Record a local edit.
    ///
    /// The local display value updates immediately; the remote write is
    /// re-armed to fire one quiet window after this (now latest) edit.
    pub fn submit_edit(&self, value: u8) {
        let value = value.min(100);
        self.state.set_local_sensitivity(value);

        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        let feed = self.feed.clone();
        let state = self.state.clone();
        let topic = self.topic.clone();
        let quiet = self.quiet;
        let token = self.token.clone();

        *pending = Some(self.tracker.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(quiet) => {
                    debug!("[Panel] sensitivity settled at {}, writing", value);
                    if let Err(e) = feed.write(&topic, &feed::encode_sensitivity(value)).await {
                        // Not retried; the next device publication reconciles
                        warn!("[Panel] sensitivity write failed: {}", e);
                    }
                    state.confirm_sensitivity(value);
                }
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::MemoryFeedStore;

    fn writer(
        feed: Arc<MemoryFeedStore>,
        token: CancellationToken,
    ) -> (DebouncedWriter, Arc<PanelState>) {
        let state = Arc::new(PanelState::new());
        let writer = DebouncedWriter::new(
            feed,
            state.clone(),
            "sensor".to_string(),
            Duration::from_millis(1500),
            TaskTracker::new(),
            token,
        );
        (writer, state)
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_coalesce_into_one_write() {
        let feed = Arc::new(MemoryFeedStore::new());
        let (writer, state) = writer(feed.clone(), CancellationToken::new());

        for value in [10, 20, 30] {
            writer.submit_edit(value);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        // Every edit is visible locally right away
        assert_eq!(state.snapshot().sensitivity_local, Some(30));
        assert_eq!(state.snapshot().sensitivity_remote, None);

        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(feed.writes_to("sensor"), vec!["sensitivity:30"]);
        assert_eq!(state.snapshot().sensitivity_remote, Some(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_waits_for_quiet_window() {
        let feed = Arc::new(MemoryFeedStore::new());
        let (writer, _state) = writer(feed.clone(), CancellationToken::new());

        writer.submit_edit(40);
        tokio::time::sleep(Duration::from_millis(1400)).await;
        assert!(feed.writes().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(feed.writes_to("sensor"), vec!["sensitivity:40"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_edit_restarts_the_window() {
        let feed = Arc::new(MemoryFeedStore::new());
        let (writer, _state) = writer(feed.clone(), CancellationToken::new());

        writer.submit_edit(10);
        tokio::time::sleep(Duration::from_millis(1400)).await;
        writer.submit_edit(20);

        // 1.4s after the second edit: the first timer was superseded,
        // the second has not fired yet
        tokio::time::sleep(Duration::from_millis(1400)).await;
        assert!(feed.writes().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(feed.writes_to("sensor"), vec!["sensitivity:20"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_discards_pending_write() {
        let feed = Arc::new(MemoryFeedStore::new());
        let token = CancellationToken::new();
        let (writer, state) = writer(feed.clone(), token.clone());

        writer.submit_edit(70);
        token.cancel();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(feed.writes().is_empty());
        // The optimistic local value survives, nothing was confirmed
        assert_eq!(state.snapshot().sensitivity_local, Some(70));
        assert_eq!(state.snapshot().sensitivity_remote, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_edit_is_clamped() {
        let feed = Arc::new(MemoryFeedStore::new());
        let (writer, state) = writer(feed.clone(), CancellationToken::new());

        writer.submit_edit(255);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(state.snapshot().sensitivity_local, Some(100));
        assert_eq!(feed.writes_to("sensor"), vec!["sensitivity:100"]);
    }
}
