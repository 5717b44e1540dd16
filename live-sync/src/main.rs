use live_sync::{Credential, Tracker, TrackerConfig, load_config, load_default_config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracker_core::OrderId;

fn print_help() {
    eprintln!(
        r#"Live Sync - real-time monitor for the order-tracking backend

USAGE:
    live-sync [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --order <ID>        Follow details and alarms of one order
    --help              Print this help message

ENVIRONMENT VARIABLES:
    TRACKER_TOKEN       Bearer token for the API and the broker
    RUST_LOG            Log level filter (default: live_sync=info)

EXAMPLES:
    # Watch the orders table with the embedded configuration
    TRACKER_TOKEN=... live-sync

    # Follow one order
    TRACKER_TOKEN=... live-sync --config tracker.json --order 42
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "live_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut order: Option<OrderId> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            "--order" | "-o" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --order requires an order id");
                    std::process::exit(1);
                }
                order = Some(OrderId::new(args[i].as_str()));
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config: TrackerConfig = match config_path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            load_config(&path)?
        }
        None => {
            tracing::info!("Using default configuration");
            load_default_config()?
        }
    };
    config.validate()?;

    let token = std::env::var("TRACKER_TOKEN").ok();
    if token.is_none() {
        tracing::warn!("TRACKER_TOKEN not set, requests will be anonymous");
    }

    tracing::info!("API: {}", config.api.base_url);
    tracing::info!("Broker: {}", config.broker.url);

    let tracker = Tracker::new(config, token.clone());
    tracker.connect(Credential::bearer(token.unwrap_or_default()));

    let orders = tracker.orders_view().await;
    let pagination = tracker.orders().table().pagination();
    tracing::info!(
        phase = ?orders.phase(),
        total = pagination.total_elements,
        pages = pagination.total_pages,
        "orders table loaded"
    );

    let followed = match order.filter(|id| !id.is_empty()) {
        Some(id) => {
            if let Err(e) = tracker.open_order(&id).await {
                tracing::warn!(order_id = %id, error = %e, "failed to load order");
            }
            let details = tracker.order_details_view(id.clone()).await;
            let alarms = tracker.order_alarms_view(id.clone()).await;
            let history = tracker.history_feed(id.clone());
            if let Err(e) = history.load().await {
                tracing::warn!(order_id = %id, error = %e, "failed to load sample history");
            }
            tracing::info!(order_id = %id, "following order");
            Some((details, alarms, history))
        }
        None => None,
    };

    let mut connection = tracker.channel().watch_connection();
    let mut samples = tracker.details().table().watch();
    let mut alarm_changes = tracker.alarms().table().watch();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Ok(()) = connection.changed() => {
                tracing::info!(connected = *connection.borrow_and_update(), "push channel state");
            }
            Ok(()) = samples.changed() => {
                samples.borrow_and_update();
                if let Some(sample) = tracker.details().latest() {
                    tracing::info!(
                        sample_id = sample.id,
                        mass = %sample.accumulated_mass,
                        temperature = %sample.temperature,
                        flow_rate = %sample.flow_rate,
                        "sample"
                    );
                }
            }
            Ok(()) = alarm_changes.changed() => {
                alarm_changes.borrow_and_update();
                if let Some(alarm) = tracker.alarms().live() {
                    tracing::warn!(alarm_id = alarm.id, status = %alarm.status, temperature = %alarm.temperature, "alarm");
                }
            }
        }
    }

    tracing::info!("Shutting down");
    if let Some((details, alarms, history)) = followed {
        details.unmount();
        alarms.unmount();
        history.unmount();
    }
    orders.unmount();

    if tracker.disconnect() {
        tracker.channel().closed().await;
    }
    Ok(())
}
