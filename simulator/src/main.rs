mod payload;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use payload::Message;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info};

/// Fake TagoIO device API serving randomly generated satellite payloads.
#[derive(Debug, Parser)]
struct Args {
    /// Address to serve the /data endpoint on
    #[arg(long, env = "SIM_ADDR", default_value = "0.0.0.0:8686")]
    addr: String,

    /// Seconds between generated messages
    #[arg(long, env = "SIM_INTERVAL_SECS", default_value_t = 5)]
    interval_secs: u64,

    /// How many messages to keep available for fetching
    #[arg(long, env = "SIM_HISTORY", default_value_t = 100)]
    history: usize,
}

type History = Arc<Mutex<VecDeque<Message>>>;

#[derive(Debug, Deserialize)]
struct DataQuery {
    #[serde(default = "default_qty")]
    qty: usize,
}

fn default_qty() -> usize {
    15
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting device API simulator");
    info!(
        "Serving on {}, new message every {}s, history {}",
        args.addr, args.interval_secs, args.history
    );

    let history: History = Arc::new(Mutex::new(VecDeque::new()));

    // Producer task: one fresh payload per interval, oldest dropped first.
    let producer_history = history.clone();
    let (interval_secs, capacity) = (args.interval_secs, args.history);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;

            let message = Message::random();
            info!("generated {} -> {}", message.time, message.value);

            let mut history = producer_history.lock().unwrap();
            history.push_back(message);
            while history.len() > capacity {
                history.pop_front();
            }
        }
    });

    let app = Router::new()
        .route("/data", get(get_data))
        .with_state(history);

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", args.addr, e);
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, app).await {
        error!("HTTP server error: {}", e);
    }
}

/// Most recent messages first, like the real endpoint.
async fn get_data(
    State(history): State<History>,
    Query(params): Query<DataQuery>,
) -> Json<Value> {
    let history = history.lock().unwrap();
    let newest: Vec<&Message> = history.iter().rev().take(params.qty).collect();

    Json(json!({ "status": true, "result": newest }))
}
