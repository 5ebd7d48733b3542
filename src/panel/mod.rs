//! Panel composition root.
//!
//! A [`Panel`] owns the shared state and wires the polling scheduler, the
//! debounced writer and the mode arbiter to one injected feed store. All
//! timers the panel arms live on a task tracker tied to a cancellation
//! token, so unmounting is a guaranteed teardown: no poll, debounce or
//! advisory timer can touch state afterwards.

pub mod arbiter;
pub mod poller;
pub mod reconciler;
pub mod state;
pub mod writer;

use crate::config::PanelConfig;
use crate::feed::FeedStore;
use arbiter::ModeArbiter;
use log::info;
use poller::Poller;
use reconciler::Reconciler;
use state::PanelState;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use writer::DebouncedWriter;

pub use state::PanelSnapshot;

pub struct Panel {
    state: Arc<PanelState>,
    writer: DebouncedWriter,
    arbiter: ModeArbiter,
    tracker: TaskTracker,
    token: CancellationToken,
}

impl Panel {
    /// Mount the panel: create the state cell and start polling.
    pub fn mount(feed: Arc<dyn FeedStore>, config: PanelConfig) -> Self {
        let state = Arc::new(PanelState::new());
        let tracker = TaskTracker::new();
        let token = CancellationToken::new();

        Poller::new(
            feed.clone(),
            config.channels.clone(),
            Reconciler::new(state.clone()),
            config.poll_interval(),
        )
        .spawn(tracker.clone(), token.clone());

        let writer = DebouncedWriter::new(
            feed.clone(),
            state.clone(),
            config.channels.sensor.clone(),
            config.debounce_quiet(),
            tracker.clone(),
            token.clone(),
        );

        let arbiter = ModeArbiter::new(
            feed,
            state.clone(),
            &config.channels,
            config.advisory_window(),
            tracker.clone(),
            token.clone(),
        );

        info!("[Panel] mounted");
        Self {
            state,
            writer,
            arbiter,
            tracker,
            token,
        }
    }

    /// Current state, for one-shot rendering.
    pub fn snapshot(&self) -> PanelSnapshot {
        self.state.snapshot()
    }

    /// Subscribe to state changes; the presentation layer re-renders on
    /// every received snapshot.
    pub fn subscribe(&self) -> watch::Receiver<PanelSnapshot> {
        self.state.subscribe()
    }

    /// Continuous-range gesture: sensitivity slider edit.
    pub fn set_sensitivity(&self, value: u8) {
        self.writer.submit_edit(value);
    }

    /// Toggle gesture: light switch.
    pub fn toggle_light(&self) {
        self.arbiter.toggle_light();
    }

    /// Toggle gesture: auto/manual mode flag.
    pub fn toggle_mode(&self) {
        self.arbiter.toggle_mode();
    }

    /// Unmount the panel: cancel every timer and wait for all tasks to
    /// finish. Pending debounced writes are discarded, not flushed.
    pub async fn unmount(&self) {
        self.token.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("[Panel] unmounted");
    }
}

impl Drop for Panel {
    fn drop(&mut self) {
        // Backstop for a panel dropped without unmount
        self.token.cancel();
    }
}
