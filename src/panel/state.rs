//! Shared panel state.
//!
//! One cell holds the decoded value of every device attribute. All fields
//! start out unknown and are filled in by the reconciler as polls arrive;
//! the presentation layer renders a loading indicator until the last one
//! resolves.
//!
//! Mutations are change-detecting: writing the value a field already holds
//! neither bumps the version nor wakes subscribers, so a steady 1 Hz poll
//! of unchanged remote state causes no re-renders.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Read-only view of the panel, as consumed by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelSnapshot {
    pub light_on: Option<bool>,
    /// Last sensitivity value confirmed on the remote feed.
    pub sensitivity_remote: Option<u8>,
    /// Sensitivity as the operator sees it: seeded once from the remote,
    /// then owned by local edits.
    pub sensitivity_local: Option<u8>,
    pub auto_mode: Option<bool>,
    pub curtain_open: Option<bool>,
    /// True while a "toggle blocked by auto mode" advisory is showing.
    pub advisory: bool,
}

impl PanelSnapshot {
    /// True until every attribute has been seen at least once.
    pub fn is_loading(&self) -> bool {
        self.light_on.is_none()
            || self.sensitivity_local.is_none()
            || self.auto_mode.is_none()
            || self.curtain_open.is_none()
    }
}

impl fmt::Display for PanelSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn onoff(v: Option<bool>) -> &'static str {
            match v {
                Some(true) => "on",
                Some(false) => "off",
                None => "?",
            }
        }
        write!(
            f,
            "light {}, {} mode, curtains {}, sensitivity {} (remote {}){}",
            onoff(self.light_on),
            match self.auto_mode {
                Some(true) => "auto",
                Some(false) => "manual",
                None => "?",
            },
            match self.curtain_open {
                Some(true) => "open",
                Some(false) => "closed",
                None => "?",
            },
            self.sensitivity_local
                .map_or("?".to_string(), |v| v.to_string()),
            self.sensitivity_remote
                .map_or("?".to_string(), |v| v.to_string()),
            if self.advisory { ", advisory showing" } else { "" },
        )
    }
}

/// The panel's mutable state cell.
///
/// Observers subscribe through a watch channel and get a fresh snapshot on
/// every real change. The version counter increments with each change and
/// exists for change assertions in tests.
pub struct PanelState {
    cell: watch::Sender<PanelSnapshot>,
    version: AtomicU64,
}

impl PanelState {
    pub fn new() -> Self {
        let (cell, _) = watch::channel(PanelSnapshot::default());
        Self {
            cell,
            version: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        self.cell.borrow().clone()
    }

    /// Subscribe to state changes. Each received value is a full snapshot.
    pub fn subscribe(&self) -> watch::Receiver<PanelSnapshot> {
        self.cell.subscribe()
    }

    /// Number of changes applied so far.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    pub fn light_on(&self) -> Option<bool> {
        self.cell.borrow().light_on
    }

    pub fn auto_mode(&self) -> Option<bool> {
        self.cell.borrow().auto_mode
    }

    pub fn advisory(&self) -> bool {
        self.cell.borrow().advisory
    }

    /// Overwrite the light state (poll result or optimistic toggle).
    pub fn set_light_on(&self, value: bool) {
        self.update(|s| {
            let next = Some(value);
            let changed = s.light_on != next;
            s.light_on = next;
            changed
        });
    }

    /// Overwrite the mode flag (poll result or optimistic toggle).
    pub fn set_auto_mode(&self, value: bool) {
        self.update(|s| {
            let next = Some(value);
            let changed = s.auto_mode != next;
            s.auto_mode = next;
            changed
        });
    }

    /// Overwrite the curtain position (poll result).
    pub fn set_curtain_open(&self, value: bool) {
        self.update(|s| {
            let next = Some(value);
            let changed = s.curtain_open != next;
            s.curtain_open = next;
            changed
        });
    }

    /// Apply a remote sensor reading.
    ///
    /// The remote value is always overwritten; the local value is seeded
    /// exactly once, on the first reading, and never touched by remote
    /// data again. A slow broker echo therefore cannot fight an
    /// in-progress slider drag.
    pub fn apply_remote_sensitivity(&self, value: u8) {
        self.update(|s| {
            let mut changed = false;
            if s.sensitivity_remote != Some(value) {
                s.sensitivity_remote = Some(value);
                changed = true;
            }
            if s.sensitivity_local.is_none() {
                s.sensitivity_local = Some(value);
                changed = true;
            }
            changed
        });
    }

    /// Optimistic local edit of the sensitivity slider.
    pub fn set_local_sensitivity(&self, value: u8) {
        self.update(|s| {
            let next = Some(value);
            let changed = s.sensitivity_local != next;
            s.sensitivity_local = next;
            changed
        });
    }

    /// Mark a debounced write as the new confirmed remote value.
    pub fn confirm_sensitivity(&self, value: u8) {
        self.update(|s| {
            let next = Some(value);
            let changed = s.sensitivity_remote != next;
            s.sensitivity_remote = next;
            changed
        });
    }

    pub fn raise_advisory(&self) {
        self.update(|s| {
            let changed = !s.advisory;
            s.advisory = true;
            changed
        });
    }

    pub fn clear_advisory(&self) {
        self.update(|s| {
            let changed = s.advisory;
            s.advisory = false;
            changed
        });
    }

    fn update(&self, mutate: impl FnOnce(&mut PanelSnapshot) -> bool) {
        let modified = self.cell.send_if_modified(mutate);
        if modified {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Default for PanelState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_unknown() {
        let state = PanelState::new();
        let snapshot = state.snapshot();
        assert!(snapshot.is_loading());
        assert_eq!(snapshot.light_on, None);
        assert_eq!(snapshot.sensitivity_remote, None);
        assert_eq!(snapshot.sensitivity_local, None);
        assert_eq!(snapshot.auto_mode, None);
        assert_eq!(snapshot.curtain_open, None);
        assert!(!snapshot.advisory);
        assert_eq!(state.version(), 0);
    }

    #[test]
    fn test_same_value_does_not_notify() {
        let state = PanelState::new();
        let mut rx = state.subscribe();

        state.set_light_on(true);
        assert_eq!(state.version(), 1);
        assert!(rx.has_changed().unwrap());
        rx.mark_unchanged();

        // Re-applying the same poll result is a no-op
        state.set_light_on(true);
        assert_eq!(state.version(), 1);
        assert!(!rx.has_changed().unwrap());

        state.set_light_on(false);
        assert_eq!(state.version(), 2);
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn test_local_sensitivity_seeds_once() {
        let state = PanelState::new();

        state.apply_remote_sensitivity(42);
        assert_eq!(state.snapshot().sensitivity_remote, Some(42));
        assert_eq!(state.snapshot().sensitivity_local, Some(42));

        // Later remote readings update only the remote side
        state.apply_remote_sensitivity(90);
        assert_eq!(state.snapshot().sensitivity_remote, Some(90));
        assert_eq!(state.snapshot().sensitivity_local, Some(42));
    }

    #[test]
    fn test_local_edit_owns_local_value() {
        let state = PanelState::new();
        state.apply_remote_sensitivity(42);

        state.set_local_sensitivity(70);
        state.apply_remote_sensitivity(55);
        assert_eq!(state.snapshot().sensitivity_local, Some(70));

        state.confirm_sensitivity(70);
        assert_eq!(state.snapshot().sensitivity_remote, Some(70));
    }

    #[test]
    fn test_loading_clears_when_all_fields_known() {
        let state = PanelState::new();
        state.set_light_on(true);
        state.set_auto_mode(false);
        state.set_curtain_open(true);
        assert!(state.snapshot().is_loading());

        state.apply_remote_sensitivity(42);
        assert!(!state.snapshot().is_loading());
    }

    #[test]
    fn test_advisory_flag() {
        let state = PanelState::new();
        state.raise_advisory();
        assert!(state.advisory());
        let v = state.version();

        // Raising twice is one change
        state.raise_advisory();
        assert_eq!(state.version(), v);

        state.clear_advisory();
        assert!(!state.advisory());
    }
}
