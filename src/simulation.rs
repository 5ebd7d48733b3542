//! Device simulation for development and testing.
//!
//! Stands in for the microcontroller on the other side of the feeds: it
//! publishes the same boot defaults the firmware does, applies light
//! commands by mirroring them onto the state channel, and periodically
//! flips the curtains, coupling the mode flag to the curtain position the
//! way the device's hall sensor does.

use crate::config::FeedChannels;
use crate::feed::{self, FeedStore};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval, interval_at};

const CURTAIN_PERIOD: Duration = Duration::from_secs(30);

/// Spawn the simulated device.
///
/// # Returns
///
/// A `JoinHandle` that can be used to abort the simulation task.
pub fn run_device_simulation(feed: Arc<dyn FeedStore>, channels: FeedChannels) -> JoinHandle<()> {
    tokio::spawn(async move {
        // Boot defaults, as the firmware publishes on startup
        for (topic, value) in [
            (&channels.sensor, "sensitivity:50"),
            (&channels.auto_mode, "1"),
            (&channels.curtains, "open"),
            (&channels.light_state, "0"),
        ] {
            if let Err(e) = feed.write(topic, value).await {
                warn!("[Sim] boot write to {} failed: {}", topic, e);
            }
        }
        info!("[Sim] device online");

        let mut curtain_open = true;
        let mut mirror = interval(Duration::from_secs(1));
        let mut curtain_timer = interval_at(Instant::now() + CURTAIN_PERIOD, CURTAIN_PERIOD);

        loop {
            tokio::select! {
                _ = mirror.tick() => {
                    let command = match feed.read_latest(&channels.light_command).await {
                        Ok(Some(command)) => command,
                        _ => continue,
                    };
                    let mirrored = feed.read_latest(&channels.light_state).await.ok().flatten();
                    if mirrored.as_deref() != Some(command.as_str()) {
                        info!("[Sim] applying light command: {}", command);
                        if let Err(e) = feed.write(&channels.light_state, &command).await {
                            warn!("[Sim] light state write failed: {}", e);
                        }
                    }
                }
                _ = curtain_timer.tick() => {
                    curtain_open = !curtain_open;
                    info!("[Sim] curtains {}", feed::encode_curtain(curtain_open));
                    if let Err(e) = feed
                        .write(&channels.curtains, feed::encode_curtain(curtain_open))
                        .await
                    {
                        warn!("[Sim] curtain write failed: {}", e);
                    }
                    // Hall sensor coupling: open curtains switch the device
                    // to automatic, closed curtains to manual
                    if let Err(e) = feed
                        .write(&channels.auto_mode, feed::encode_bool(curtain_open))
                        .await
                    {
                        warn!("[Sim] mode write failed: {}", e);
                    }
                }
            }
        }
    })
}
