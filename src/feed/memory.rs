//! In-process feed store.
//!
//! Backs the simulated-device mode and the test suite. Holds the latest
//! value per channel in a map and keeps a log of every write so tests can
//! assert on exactly what was published.

use super::FeedStore;
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryFeedStore {
    values: RwLock<HashMap<String, String>>,
    writes: Mutex<Vec<(String, String)>>,
}

impl MemoryFeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a channel value without recording a write.
    ///
    /// Used to stage remote state that "someone else" (the device) put
    /// there, as opposed to writes issued by the code under test.
    pub fn seed(&self, channel: &str, value: &str) {
        self.values
            .write()
            .insert(channel.to_string(), value.to_string());
    }

    /// Every write issued through [`FeedStore::write`], in order.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().clone()
    }

    /// The values written to one channel, in order.
    pub fn writes_to(&self, channel: &str) -> Vec<String> {
        self.writes
            .lock()
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

#[async_trait]
impl FeedStore for MemoryFeedStore {
    async fn write(&self, channel: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .insert(channel.to_string(), value.to_string());
        self.writes
            .lock()
            .push((channel.to_string(), value.to_string()));
        Ok(())
    }

    async fn read_latest(&self, channel: &str) -> Result<Option<String>> {
        Ok(self.values.read().get(channel).cloned())
    }
}
