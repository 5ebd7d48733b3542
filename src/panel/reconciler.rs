//! Merges raw poll results into the panel state.
//!
//! Per-channel policy: light, mode and curtains are overwritten by the
//! latest poll (remote is authoritative); the sensitivity channel updates
//! the remote value and seeds the local value once. An absent payload
//! means "no data yet" and leaves the state untouched; a malformed
//! payload is dropped, never surfaced as an error.

use super::state::PanelState;
use crate::feed::{self, Channel};
use log::debug;
use std::sync::Arc;

#[derive(Clone)]
pub struct Reconciler {
    state: Arc<PanelState>,
}

impl Reconciler {
    pub fn new(state: Arc<PanelState>) -> Self {
        Self { state }
    }

    /// Apply one poll result.
    pub fn apply(&self, channel: Channel, payload: Option<String>) {
        let Some(raw) = payload else {
            // No data yet on this channel
            return;
        };

        match channel {
            Channel::LightState => match feed::decode_bool(&raw) {
                Some(value) => self.state.set_light_on(value),
                None => debug!("[Poll] dropping malformed light payload: {:?}", raw),
            },
            Channel::AutoMode => match feed::decode_bool(&raw) {
                Some(value) => self.state.set_auto_mode(value),
                None => debug!("[Poll] dropping malformed mode payload: {:?}", raw),
            },
            Channel::Curtains => match feed::decode_curtain(&raw) {
                Some(open) => self.state.set_curtain_open(open),
                None => debug!("[Poll] dropping malformed curtain payload: {:?}", raw),
            },
            Channel::Sensor => match feed::decode_sensor(&raw) {
                Some(value) => self.state.apply_remote_sensitivity(value),
                None => debug!("[Poll] dropping malformed sensor payload: {:?}", raw),
            },
            Channel::LightCommand => {
                debug!("[Poll] ignoring result for write-only channel");
            }
        }
    }
}
