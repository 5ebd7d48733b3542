//! MQTT-backed feed store.
//!
//! Subscribes to every panel channel and caches the latest payload per
//! topic, so `read_latest` is a local lookup. Values are published with
//! the retain flag, which makes the broker hand the latest value to any
//! subscriber that connects later, matching the feed store semantic.

use super::FeedStore;
use crate::config::MqttConfig;
use crate::error::{PanelError, Result};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use parking_lot::RwLock;
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

type LatestCache = Arc<RwLock<HashMap<String, String>>>;

pub struct MqttFeedStore {
    client: AsyncClient,
    latest: LatestCache,
}

impl MqttFeedStore {
    /// Connect to the broker and subscribe to the given channel topics.
    ///
    /// Spawns the MQTT event loop as a background task and waits up to
    /// 10 seconds for the first ConnAck. The event loop keeps running for
    /// the life of the process and resubscribes after every reconnect.
    pub async fn connect(config: &MqttConfig, topics: &[String]) -> Result<Self> {
        // Random suffix so a second panel instance doesn't kick us off the broker
        let client_id = format!("{}-{:04x}", config.client_id, rand::random::<u16>());
        let mut options = MqttOptions::new(client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(Duration::from_secs(30));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(options, 100);
        let latest: LatestCache = Arc::new(RwLock::new(HashMap::new()));

        let (connected_tx, connected_rx) = oneshot::channel();
        tokio::spawn(run_event_loop(
            event_loop,
            client.clone(),
            topics.to_vec(),
            latest.clone(),
            connected_tx,
        ));

        match tokio::time::timeout(Duration::from_secs(10), connected_rx).await {
            Ok(Ok(())) => {
                info!("[MQTT] connection established");
                Ok(Self { client, latest })
            }
            _ => Err(PanelError::ConnectTimeout),
        }
    }
}

#[async_trait]
impl FeedStore for MqttFeedStore {
    async fn write(&self, channel: &str, value: &str) -> Result<()> {
        debug!("[MQTT] publishing to {}: {}", channel, value);
        self.client
            .publish(channel, QoS::AtMostOnce, true, value.as_bytes())
            .await?;
        // Record locally too, so a read right after a write sees the value
        // before the broker echoes it back on our own subscription.
        record_latest(&self.latest, channel, value.to_string());
        Ok(())
    }

    async fn read_latest(&self, channel: &str) -> Result<Option<String>> {
        Ok(self.latest.read().get(channel).cloned())
    }
}

/// Store a payload as the topic's latest value.
fn record_latest(latest: &RwLock<HashMap<String, String>>, topic: &str, payload: String) {
    latest.write().insert(topic.to_string(), payload);
}

async fn run_event_loop(
    mut event_loop: EventLoop,
    client: AsyncClient,
    topics: Vec<String>,
    latest: LatestCache,
    connected_tx: oneshot::Sender<()>,
) {
    let mut connected = Some(connected_tx);

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("[MQTT] connected, subscribing to {} channels", topics.len());
                for topic in &topics {
                    if let Err(e) = client.subscribe(topic.as_str(), QoS::AtMostOnce).await {
                        warn!("[MQTT] failed to subscribe to {}: {:?}", topic, e);
                    }
                }
                if let Some(tx) = connected.take() {
                    let _ = tx.send(());
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                match String::from_utf8(publish.payload.to_vec()) {
                    Ok(payload) => {
                        debug!("[MQTT] received on {}: {}", publish.topic, payload);
                        record_latest(&latest, &publish.topic, payload);
                    }
                    Err(e) => {
                        warn!("[MQTT] invalid UTF-8 payload on {}: {}", publish.topic, e);
                    }
                }
            }
            Ok(_) => {}
            Err(ConnectionError::RequestsDone) => {
                info!("[MQTT] client dropped, stopping event loop");
                break;
            }
            Err(e) => {
                error!("[MQTT] connection error: {:?}", e);
                // Wait before reconnecting
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}
