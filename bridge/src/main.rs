use axum::{routing::get, Router};
use bridge::influx::InfluxClient;
use bridge::metrics;
use bridge::process::{process_batch, Watermark};
use bridge::tago::TagoClient;
use std::env;
use std::time::Duration;
use tokio::time::{interval, Instant};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let tago_url = env::var("TAGO_URL").unwrap_or_else(|_| "https://api.tago.io".to_string());
    let influx_host = env::var("INFLUX_HOST").unwrap_or_else(|_| "influxdb".to_string());
    let influx_port: u16 = env::var("INFLUX_PORT")
        .unwrap_or_else(|_| "8086".to_string())
        .parse()
        .unwrap_or(8086);
    let influx_db = env::var("INFLUX_DB").unwrap_or_else(|_| "myriota_db".to_string());
    let fetch_limit: usize = env::var("FETCH_LIMIT")
        .unwrap_or_else(|_| "100".to_string())
        .parse()
        .unwrap_or(100);
    let poll_interval_secs: u64 = env::var("POLL_INTERVAL_SECS")
        .unwrap_or_else(|_| "30".to_string())
        .parse()
        .unwrap_or(30);
    let http_addr = env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:9090".to_string());

    // The device token is the one setting without a sane default.
    let tago_token = match env::var("TAGO_TOKEN") {
        Ok(token) if !token.is_empty() => token,
        _ => {
            error!("TAGO_TOKEN must be set");
            std::process::exit(1);
        }
    };

    info!("Starting satellite telemetry bridge");
    info!("Telemetry API: {}", tago_url);
    info!("Store: {}:{} db={}", influx_host, influx_port, influx_db);

    // Initialize metrics
    metrics::init_metrics();

    let tago = match TagoClient::new(tago_url, tago_token) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build telemetry client: {}", e);
            std::process::exit(1);
        }
    };

    let influx = match InfluxClient::new(&influx_host, influx_port, &influx_db) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build store client: {}", e);
            std::process::exit(1);
        }
    };

    // Fail fast when the store is unreachable instead of polling into a void.
    if let Err(e) = influx.ensure_database().await {
        error!("Failed to reach store: {}", e);
        std::process::exit(1);
    }

    // Spawn the polling task
    let poller_handle = tokio::spawn(async move {
        run_poller(tago, influx, fetch_limit, poll_interval_secs).await;
    });

    // Metrics endpoint
    let app = Router::new().route("/metrics", get(metrics_handler));
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", http_addr, e);
            std::process::exit(1);
        });

    info!("Metrics endpoint listening on {}", http_addr);

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap_or_else(|e| {
            error!("HTTP server error: {}", e);
        });
    });

    tokio::select! {
        _ = poller_handle => {
            error!("Poller task terminated");
        }
        _ = server_handle => {
            error!("HTTP server terminated");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Shutting down");
}

/// Fetches and processes one batch per tick, forever. The watermark lives
/// here and is threaded through every processing call.
async fn run_poller(
    tago: TagoClient,
    influx: InfluxClient,
    fetch_limit: usize,
    poll_interval_secs: u64,
) {
    info!(
        "Polling every {}s with batch limit {}",
        poll_interval_secs, fetch_limit
    );

    let mut watermark = Watermark::unset();
    let mut ticker = interval(Duration::from_secs(poll_interval_secs));

    loop {
        ticker.tick().await;

        let start = Instant::now();
        let batch = tago.fetch_batch(fetch_limit).await;
        if batch.is_empty() {
            continue;
        }

        let saved = process_batch(batch, &mut watermark, &influx).await;
        metrics::CYCLE_SECONDS.observe(start.elapsed().as_secs_f64());

        if saved > 0 {
            info!("-> {} new records", saved);
        }
    }
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
