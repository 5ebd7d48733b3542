use crate::feed::Channel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Find the first '=' and split there
        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            // Remove surrounding quotes if present
            if (value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\''))
            {
                value = &value[1..value.len() - 1];
            }

            // Only set if not already set (env vars take precedence)
            if std::env::var(key).is_err() {
                // SAFETY: We're single-threaded at this point (called before any async runtime)
                unsafe { std::env::set_var(key, value) };
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub panel: PanelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Timing and channel configuration for the panel loop.
///
/// Durations are kept as milliseconds so the struct stays plain data;
/// the accessor methods hand out `Duration`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    pub poll_interval_ms: u64,
    pub debounce_quiet_ms: u64,
    pub advisory_window_ms: u64,
    pub channels: FeedChannels,
}

impl PanelConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn debounce_quiet(&self) -> Duration {
        Duration::from_millis(self.debounce_quiet_ms)
    }

    pub fn advisory_window(&self) -> Duration {
        Duration::from_millis(self.advisory_window_ms)
    }
}

/// Topic keys for the five feed channels.
///
/// Defaults match the device firmware's feed names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedChannels {
    pub light_command: String,
    pub light_state: String,
    pub auto_mode: String,
    pub curtains: String,
    pub sensor: String,
}

impl FeedChannels {
    /// Topic key for a channel role.
    pub fn key(&self, channel: Channel) -> &str {
        match channel {
            Channel::LightCommand => &self.light_command,
            Channel::LightState => &self.light_state,
            Channel::AutoMode => &self.auto_mode,
            Channel::Curtains => &self.curtains,
            Channel::Sensor => &self.sensor,
        }
    }

    /// All topic keys, for subscribing.
    pub fn topics(&self) -> Vec<String> {
        [
            &self.light_command,
            &self.light_state,
            &self.auto_mode,
            &self.curtains,
            &self.sensor,
        ]
        .into_iter()
        .cloned()
        .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig {
                broker_host: "localhost".to_string(),
                broker_port: 1883,
                client_id: "feed-panel".to_string(),
                username: None,
                password: None,
            },
            panel: PanelConfig::default(),
        }
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            debounce_quiet_ms: 1500,
            advisory_window_ms: 5000,
            channels: FeedChannels::default(),
        }
    }
}

impl Default for FeedChannels {
    fn default() -> Self {
        Self {
            light_command: "lightswitch".to_string(),
            light_state: "lightswitchstate".to_string(),
            auto_mode: "automanual".to_string(),
            curtains: "curtains".to_string(),
            sensor: "sensor".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // MQTT configuration
        if let Ok(host) = std::env::var("MQTT_BROKER_HOST") {
            config.mqtt.broker_host = host;
        }
        if let Ok(port) = std::env::var("MQTT_BROKER_PORT")
            && let Ok(p) = port.parse()
        {
            config.mqtt.broker_port = p;
        }
        if let Ok(client_id) = std::env::var("MQTT_CLIENT_ID") {
            config.mqtt.client_id = client_id;
        }
        if let Ok(username) = std::env::var("MQTT_USERNAME") {
            config.mqtt.username = Some(username);
        }
        if let Ok(password) = std::env::var("MQTT_PASSWORD") {
            config.mqtt.password = Some(password);
        }

        // Channel topic keys
        if let Ok(key) = std::env::var("FEED_CHANNEL_LIGHT_COMMAND") {
            config.panel.channels.light_command = key;
        }
        if let Ok(key) = std::env::var("FEED_CHANNEL_LIGHT_STATE") {
            config.panel.channels.light_state = key;
        }
        if let Ok(key) = std::env::var("FEED_CHANNEL_AUTO_MODE") {
            config.panel.channels.auto_mode = key;
        }
        if let Ok(key) = std::env::var("FEED_CHANNEL_CURTAINS") {
            config.panel.channels.curtains = key;
        }
        if let Ok(key) = std::env::var("FEED_CHANNEL_SENSOR") {
            config.panel.channels.sensor = key;
        }

        // Panel timing
        if let Ok(interval) = std::env::var("PANEL_POLL_INTERVAL_MS")
            && let Ok(ms) = interval.parse()
        {
            config.panel.poll_interval_ms = ms;
        }
        if let Ok(quiet) = std::env::var("PANEL_DEBOUNCE_MS")
            && let Ok(ms) = quiet.parse()
        {
            config.panel.debounce_quiet_ms = ms;
        }
        if let Ok(window) = std::env::var("PANEL_ADVISORY_MS")
            && let Ok(ms) = window.parse()
        {
            config.panel.advisory_window_ms = ms;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_channel_keys() {
        let channels = FeedChannels::default();
        assert_eq!(channels.key(Channel::LightCommand), "lightswitch");
        assert_eq!(channels.key(Channel::LightState), "lightswitchstate");
        assert_eq!(channels.key(Channel::AutoMode), "automanual");
        assert_eq!(channels.key(Channel::Curtains), "curtains");
        assert_eq!(channels.key(Channel::Sensor), "sensor");
        assert_eq!(channels.topics().len(), 5);
    }

    #[test]
    fn test_default_timing() {
        let panel = PanelConfig::default();
        assert_eq!(panel.poll_interval(), Duration::from_secs(1));
        assert_eq!(panel.debounce_quiet(), Duration::from_millis(1500));
        assert_eq!(panel.advisory_window(), Duration::from_secs(5));
    }

    #[test]
    fn test_from_env_overrides() {
        // SAFETY: no other thread reads these variables while the test runs
        unsafe {
            std::env::set_var("MQTT_BROKER_HOST", "broker.example");
            std::env::set_var("MQTT_BROKER_PORT", "8883");
            std::env::set_var("FEED_CHANNEL_SENSOR", "bedroom-sensor");
            std::env::set_var("PANEL_POLL_INTERVAL_MS", "250");
        }

        let config = Config::from_env();
        assert_eq!(config.mqtt.broker_host, "broker.example");
        assert_eq!(config.mqtt.broker_port, 8883);
        assert_eq!(config.panel.channels.sensor, "bedroom-sensor");
        assert_eq!(config.panel.poll_interval_ms, 250);

        // SAFETY: as above
        unsafe {
            std::env::remove_var("MQTT_BROKER_HOST");
            std::env::remove_var("MQTT_BROKER_PORT");
            std::env::remove_var("FEED_CHANNEL_SENSOR");
            std::env::remove_var("PANEL_POLL_INTERVAL_MS");
        }
    }
}
