//! Mode arbiter for toggle commands.
//!
//! The light toggle is only honored in manual mode. In auto mode (or while
//! the mode is still unknown) the toggle is suppressed and a transient
//! advisory is raised instead; the advisory clears itself after a fixed
//! window, and a repeat rejection restarts that window. The mode toggle
//! itself is never gated and never debounced.

use super::state::PanelState;
use crate::config::FeedChannels;
use crate::feed::{self, FeedStore};
use log::{info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub struct ModeArbiter {
    feed: Arc<dyn FeedStore>,
    state: Arc<PanelState>,
    command_topic: String,
    mirror_topic: String,
    mode_topic: String,
    advisory_window: Duration,
    advisory_expiry: Mutex<Option<JoinHandle<()>>>,
    tracker: TaskTracker,
    token: CancellationToken,
}

impl ModeArbiter {
    pub fn new(
        feed: Arc<dyn FeedStore>,
        state: Arc<PanelState>,
        channels: &FeedChannels,
        advisory_window: Duration,
        tracker: TaskTracker,
        token: CancellationToken,
    ) -> Self {
        Self {
            feed,
            state,
            command_topic: channels.light_command.clone(),
            mirror_topic: channels.light_state.clone(),
            mode_topic: channels.auto_mode.clone(),
            advisory_window,
            advisory_expiry: Mutex::new(None),
            tracker,
            token,
        }
    }

    /// Handle the light-switch toggle gesture.
    pub fn toggle_light(&self) {
        if self.state.auto_mode() != Some(false) {
            info!("[Panel] light toggle blocked: auto mode is active");
            self.state.raise_advisory();
            self.arm_advisory_expiry();
            return;
        }

        self.dismiss_advisory();

        // Optimistic flip, visible before any confirmation; an unknown
        // light is treated as off, so the first toggle turns it on
        let next = !self.state.light_on().unwrap_or(false);
        self.state.set_light_on(next);
        let value = feed::encode_bool(next);
        info!("[Panel] light switched {}", if next { "on" } else { "off" });

        // Command and mirror writes are independent and unordered;
        // a partial failure is logged per channel, never rolled back
        let feed = self.feed.clone();
        let command_topic = self.command_topic.clone();
        let mirror_topic = self.mirror_topic.clone();
        self.tracker.spawn(async move {
            let (command, mirror) = futures_util::future::join(
                feed.write(&command_topic, value),
                feed.write(&mirror_topic, value),
            )
            .await;
            if let Err(e) = command {
                warn!("[Panel] light command write failed: {}", e);
            }
            if let Err(e) = mirror {
                warn!("[Panel] light state write failed: {}", e);
            }
        });
    }

    /// Handle the auto/manual toggle gesture. Always writes immediately.
    pub fn toggle_mode(&self) {
        // An unknown mode toggles to manual, matching the flag encoding
        let next = !self.state.auto_mode().unwrap_or(true);
        self.state.set_auto_mode(next);
        info!(
            "[Panel] mode switched to {}",
            if next { "automatic" } else { "manual" }
        );

        let feed = self.feed.clone();
        let mode_topic = self.mode_topic.clone();
        self.tracker.spawn(async move {
            if let Err(e) = feed.write(&mode_topic, feed::encode_bool(next)).await {
                warn!("[Panel] mode write failed: {}", e);
            }
        });
    }

    /// (Re)start the advisory auto-expiry window.
    fn arm_advisory_expiry(&self) {
        let mut slot = self.advisory_expiry.lock();
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        let state = self.state.clone();
        let window = self.advisory_window;
        let token = self.token.clone();
        *slot = Some(self.tracker.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(window) => state.clear_advisory(),
            }
        }));
    }

    fn dismiss_advisory(&self) {
        if let Some(expiry) = self.advisory_expiry.lock().take() {
            expiry.abort();
        }
        self.state.clear_advisory();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::MemoryFeedStore;

    fn arbiter(feed: Arc<MemoryFeedStore>) -> (ModeArbiter, Arc<PanelState>) {
        let state = Arc::new(PanelState::new());
        let arbiter = ModeArbiter::new(
            feed,
            state.clone(),
            &FeedChannels::default(),
            Duration::from_secs(5),
            TaskTracker::new(),
            CancellationToken::new(),
        );
        (arbiter, state)
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_mode_blocks_light_toggle() {
        let feed = Arc::new(MemoryFeedStore::new());
        let (arbiter, state) = arbiter(feed.clone());
        state.set_auto_mode(true);
        state.set_light_on(false);

        arbiter.toggle_light();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(feed.writes().is_empty());
        assert_eq!(state.light_on(), Some(false));
        assert!(state.advisory());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_mode_blocks_light_toggle() {
        let feed = Arc::new(MemoryFeedStore::new());
        let (arbiter, state) = arbiter(feed.clone());

        arbiter.toggle_light();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(feed.writes().is_empty());
        assert!(state.advisory());
    }

    #[tokio::test(start_paused = true)]
    async fn test_advisory_expires_after_window() {
        let feed = Arc::new(MemoryFeedStore::new());
        let (arbiter, state) = arbiter(feed);
        state.set_auto_mode(true);

        arbiter.toggle_light();
        tokio::time::sleep(Duration::from_millis(4900)).await;
        assert!(state.advisory());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!state.advisory());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_rejection_restarts_the_window() {
        let feed = Arc::new(MemoryFeedStore::new());
        let (arbiter, state) = arbiter(feed);
        state.set_auto_mode(true);

        arbiter.toggle_light();
        tokio::time::sleep(Duration::from_secs(3)).await;
        arbiter.toggle_light();

        // 5s after the first rejection, but only 2.5s after the second
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(state.advisory());

        tokio::time::sleep(Duration::from_millis(2600)).await;
        assert!(!state.advisory());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_toggle_writes_command_and_mirror() {
        let feed = Arc::new(MemoryFeedStore::new());
        let (arbiter, state) = arbiter(feed.clone());
        state.set_auto_mode(false);
        state.set_light_on(false);

        arbiter.toggle_light();
        // Optimistic update lands before the writes complete
        assert_eq!(state.light_on(), Some(true));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(feed.writes_to("lightswitch"), vec!["1"]);
        assert_eq!(feed.writes_to("lightswitchstate"), vec!["1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepted_toggle_dismisses_advisory() {
        let feed = Arc::new(MemoryFeedStore::new());
        let (arbiter, state) = arbiter(feed);
        state.set_auto_mode(true);
        arbiter.toggle_light();
        assert!(state.advisory());

        state.set_auto_mode(false);
        arbiter.toggle_light();
        assert!(!state.advisory());

        // The aborted expiry task must not clear a later advisory early
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!state.advisory());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_toggle_is_ungated_and_immediate() {
        let feed = Arc::new(MemoryFeedStore::new());
        let (arbiter, state) = arbiter(feed.clone());
        state.set_auto_mode(true);

        arbiter.toggle_mode();
        assert_eq!(state.auto_mode(), Some(false));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(feed.writes_to("automanual"), vec!["0"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_mode_toggles_to_manual() {
        let feed = Arc::new(MemoryFeedStore::new());
        let (arbiter, state) = arbiter(feed.clone());

        arbiter.toggle_mode();
        assert_eq!(state.auto_mode(), Some(false));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(feed.writes_to("automanual"), vec!["0"]);
    }
}
