//! Remote feed store abstraction.
//!
//! A feed store is a set of named channels, each holding the latest
//! string-encoded value of one device attribute. The panel only ever needs
//! two operations on it: publish a value and read the latest one back.

pub mod memory;
pub mod mqtt;

use crate::error::Result;
use async_trait::async_trait;
use strum::IntoEnumIterator;

pub use memory::MemoryFeedStore;
pub use mqtt::MqttFeedStore;

/// Client contract for the remote feed store.
///
/// Both operations are independent per channel: a failure on one channel
/// must not block or fail the others, and no ordering is guaranteed across
/// channels.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Publish `value` as the channel's new latest value.
    async fn write(&self, channel: &str, value: &str) -> Result<()>;

    /// Read the channel's latest value, or `None` if the channel has no
    /// data yet.
    async fn read_latest(&self, channel: &str) -> Result<Option<String>>;
}

/// The five channel roles the panel talks to.
///
/// Topic keys are configured separately (see [`crate::config::FeedChannels`]);
/// this enum only names the role a value plays in the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Channel {
    /// Light switch command (panel -> device).
    LightCommand,
    /// Light switch state mirror (device -> panel, also written on toggle).
    LightState,
    /// Automatic/manual mode flag.
    AutoMode,
    /// Curtain position.
    Curtains,
    /// Ambient-light sensitivity threshold.
    Sensor,
}

impl Channel {
    /// Whether this channel is read on every poll tick.
    /// The light command channel is write-only from the panel's side.
    pub fn is_polled(self) -> bool {
        !matches!(self, Channel::LightCommand)
    }

    /// The channels read by the polling scheduler.
    pub fn polled() -> impl Iterator<Item = Channel> {
        Channel::iter().filter(|c| c.is_polled())
    }
}

/// Wire encoding for boolean-like channels.
pub fn encode_bool(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

pub fn decode_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

/// Wire encoding for the curtain channel.
pub fn encode_curtain(open: bool) -> &'static str {
    if open { "open" } else { "closed" }
}

pub fn decode_curtain(raw: &str) -> Option<bool> {
    match raw {
        "open" => Some(true),
        "closed" => Some(false),
        _ => None,
    }
}

/// Wire encoding for a panel-issued sensitivity value.
pub fn encode_sensitivity(value: u8) -> String {
    format!("sensitivity:{value}")
}

/// Decode a sensor payload of the form `<label>:<integer 0-100>`.
///
/// The label is not validated; the device may publish under a different
/// label than the panel writes. Anything that is not a two-part pair with
/// an in-range integer is rejected.
pub fn decode_sensor(raw: &str) -> Option<u8> {
    let (_label, value) = raw.split_once(':')?;
    let value: u8 = value.parse().ok()?;
    (value <= 100).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polled_channels_exclude_light_command() {
        let polled: Vec<Channel> = Channel::polled().collect();
        assert_eq!(polled.len(), 4);
        assert!(!polled.contains(&Channel::LightCommand));
    }

    #[test]
    fn test_bool_codec() {
        assert_eq!(encode_bool(true), "1");
        assert_eq!(decode_bool("0"), Some(false));
        assert_eq!(decode_bool("on"), None);
    }

    #[test]
    fn test_curtain_codec() {
        assert_eq!(encode_curtain(false), "closed");
        assert_eq!(decode_curtain("open"), Some(true));
        assert_eq!(decode_curtain("ajar"), None);
    }

    #[test]
    fn test_sensor_decode() {
        assert_eq!(decode_sensor("sensitivity:42"), Some(42));
        assert_eq!(decode_sensor("lux:0"), Some(0));
        // malformed payloads are rejected, not clamped
        assert_eq!(decode_sensor("42"), None);
        assert_eq!(decode_sensor("sensitivity:"), None);
        assert_eq!(decode_sensor("sensitivity:abc"), None);
        assert_eq!(decode_sensor("a:b:c"), None);
        assert_eq!(decode_sensor("sensitivity:101"), None);
        assert_eq!(decode_sensor("sensitivity:-3"), None);
    }
}
