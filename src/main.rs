use clap::Parser;
use feed_panel::config::Config;
use feed_panel::feed::{FeedStore, MemoryFeedStore, MqttFeedStore};
use feed_panel::panel::Panel;
use feed_panel::simulation;
use log::info;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};

#[derive(Parser)]
#[command(name = "feed-panel")]
#[command(about = "Dashboard panel synchronized with a remote feed store")]
struct Cli {
    /// Run against an in-process simulated device instead of an MQTT broker
    #[arg(long)]
    simulate: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    feed_panel::config::load_dotenv();
    init_logger();

    let cli = Cli::parse();
    let config = Config::from_env();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&config).expect("config serializes");
        println!("{json}");
        return;
    }

    info!("Starting feed panel");

    let mut sim_task = None;
    let feed: Arc<dyn FeedStore> = if cli.simulate {
        info!("Running against a simulated device");
        let feed = Arc::new(MemoryFeedStore::new());
        sim_task = Some(simulation::run_device_simulation(
            feed.clone(),
            config.panel.channels.clone(),
        ));
        feed
    } else {
        info!(
            "Connecting to MQTT broker at {}:{}",
            config.mqtt.broker_host, config.mqtt.broker_port
        );
        match MqttFeedStore::connect(&config.mqtt, &config.panel.channels.topics()).await {
            Ok(feed) => Arc::new(feed),
            Err(e) => {
                log::error!("Failed to connect to MQTT broker: {}", e);
                std::process::exit(1);
            }
        }
    };

    let panel = Arc::new(Panel::mount(feed, config.panel.clone()));

    // Presentation collaborator: render every state change to the log
    let mut rx = panel.subscribe();
    let render_task = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            if snapshot.is_loading() {
                info!("[View] loading...");
            } else {
                info!("[View] {}", snapshot);
            }
        }
    });

    let demo_task = cli.simulate.then(|| spawn_operator_demo(panel.clone()));

    info!("Feed panel is running, press Ctrl+C to exit");
    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => log::error!("Failed to listen for shutdown signal: {}", e),
    }

    if let Some(demo) = demo_task {
        demo.abort();
    }
    render_task.abort();
    panel.unmount().await;
    if let Some(sim) = sim_task {
        sim.abort();
    }
    info!("Feed panel stopped");
}

/// Scripted operator gestures so a simulated run shows the whole loop:
/// a blocked toggle with its advisory, the mode switch, an accepted
/// toggle, and a slider drag collapsing into one debounced write.
fn spawn_operator_demo(panel: Arc<Panel>) -> JoinHandle<()> {
    tokio::spawn(async move {
        sleep(Duration::from_secs(3)).await;
        info!("[Demo] toggling light while the device is in auto mode");
        panel.toggle_light();

        sleep(Duration::from_secs(2)).await;
        info!("[Demo] switching to manual mode");
        panel.toggle_mode();

        sleep(Duration::from_secs(1)).await;
        info!("[Demo] toggling light");
        panel.toggle_light();

        sleep(Duration::from_secs(1)).await;
        info!("[Demo] dragging the sensitivity slider");
        for value in (60..=75u8).step_by(3) {
            panel.set_sensitivity(value);
            sleep(Duration::from_millis(120)).await;
        }
    })
}
