//! Mirror Tail CLI
//!
//! Connects to a venue websocket feed, subscribes to one order book and logs
//! the best levels after every update.
//!
//! Usage:
//!   cargo run --bin mirror-tail -- --symbol tBTCUSD
//!   cargo run --bin mirror-tail -- --symbol tETHUSD --prec R0 --keyed
//!   RUST_LOG=state_mirror=debug cargo run --bin mirror-tail -- --config mirror.json

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Map, Value};
use state_mirror::config::{BookVariant, MirrorConfig};
use state_mirror::dispatcher::FrameDispatcher;
use state_mirror::model::{ModelConfig, Parsed, StateRef};
use state_mirror::order_book::top_of_book;
use state_mirror::transport::{TransportEvent, WsConnect};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use types::kind::EntityKind;

#[derive(Parser, Debug)]
#[command(name = "mirror-tail")]
#[command(about = "Mirror one order book from a websocket feed and log its top levels")]
struct Args {
    /// Feed URL
    #[arg(long, default_value = "wss://api-pub.bitfinex.com/ws/2")]
    url: String,

    /// Symbol to subscribe to
    #[arg(long, default_value = "tBTCUSD")]
    symbol: String,

    /// Book precision: P0 (price levels) or R0 (raw orders)
    #[arg(long)]
    prec: Option<String>,

    /// Keep the book keyed by side instead of raw rows
    #[arg(long, default_value = "false")]
    keyed: bool,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let precision = config.book.precision();

    let mut dispatcher = FrameDispatcher::from_config(&config);
    let symbol = args.symbol.clone();
    let on_update = move |parsed: &Parsed, state: StateRef<'_>| {
        let (bid, ask) = top_of_book(state).unwrap_or((Value::Null, Value::Null));
        info!(
            symbol = %symbol,
            snapshot = parsed.is_snapshot(),
            entries = state.len(),
            best_bid = %bid,
            best_ask = %ask,
            "Book updated"
        );
    };
    dispatcher.on_managed_orderbook(Some(&args.symbol), on_update);

    let mut ws = WsConnect::new(args.url.as_str());
    ws.open()
        .await
        .with_context(|| format!("Failed to connect to {}", args.url))?;

    let mut options = Map::new();
    options.insert("symbol".to_string(), json!(args.symbol));
    options.insert("prec".to_string(), json!(precision));
    ws.subscribe("book", &options).await?;

    info!(conn_id = %ws.id(), symbol = %args.symbol, prec = precision, "Tailing book");

    loop {
        tokio::select! {
            event = ws.next_event() => match event {
                TransportEvent::Message(frame) => {
                    if let Err(e) = dispatcher.handle_frame(&frame) {
                        warn!(error = %e, "Frame not applied");
                    }
                }
                TransportEvent::Error(e) => warn!(error = %e, "Transport reported an error"),
                TransportEvent::Closed => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                ws.close().await?;
                break;
            }
        }
    }

    let stats = dispatcher.stats();
    info!(
        frames = stats.frames,
        heartbeats = stats.heartbeats,
        dropped = stats.dropped_unbound,
        ignored = stats.ignored,
        "Tail finished"
    );
    Ok(())
}

fn load_config(args: &Args) -> Result<MirrorConfig> {
    let mut config = match &args.config {
        Some(path) => MirrorConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MirrorConfig::default(),
    };

    match args.prec.as_deref() {
        Some("R0") => config = config.with_book(BookVariant::Indexed),
        Some("P0") => config = config.with_book(BookVariant::PriceLevel),
        Some(other) => anyhow::bail!("Unsupported precision {other}, expected P0 or R0"),
        None => {}
    }

    if args.keyed {
        config = config.with_component(EntityKind::Orderbook, ModelConfig::keyed());
    }

    Ok(config)
}
