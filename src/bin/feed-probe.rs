//! One-shot feed connectivity check.
//!
//! Usage:
//!   cargo run --bin feed-probe
//!
//! Connects to the MQTT broker, waits for retained values to arrive, and
//! prints the latest value of every configured channel.

use clap::Parser;
use futures_util::future::join_all;
use log::{error, info, warn};
use std::time::Duration;
use strum::IntoEnumIterator;

use feed_panel::config::Config;
use feed_panel::feed::{Channel, FeedStore, MqttFeedStore};

#[derive(Parser)]
#[command(name = "feed-probe")]
#[command(about = "Read the latest value of every configured feed channel")]
struct Cli {
    /// Seconds to wait for retained values after connecting
    #[arg(long, env = "FEED_PROBE_SETTLE", default_value_t = 2)]
    settle: u64,
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    feed_panel::config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let channels = &config.panel.channels;

    info!(
        "Connecting to MQTT broker at {}:{}",
        config.mqtt.broker_host, config.mqtt.broker_port
    );

    let feed = match MqttFeedStore::connect(&config.mqtt, &channels.topics()).await {
        Ok(feed) => feed,
        Err(e) => {
            error!("Failed to connect: {}", e);
            std::process::exit(1);
        }
    };

    // Give the broker a moment to deliver retained values
    tokio::time::sleep(Duration::from_secs(cli.settle)).await;

    let reads = join_all(Channel::iter().map(|channel| {
        let feed = &feed;
        async move { (channel, feed.read_latest(channels.key(channel)).await) }
    }))
    .await;

    for (channel, result) in reads {
        let key = channels.key(channel);
        match result {
            Ok(Some(value)) => info!("  {} ({}): {}", channel, key, value),
            Ok(None) => info!("  {} ({}): <no data>", channel, key),
            Err(e) => warn!("  {} ({}): read failed: {}", channel, key, e),
        }
    }

    info!("Probe complete.");
}
