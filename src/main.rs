//! Freight tracker - maritime route synthesis and shipment tracking
//!
//! Module structure:
//! - `domain/` - Geometry, route synthesis, progress, shipment state
//! - `services/` - Tracking board (mounted shipment views)
//! - `io/` - External interfaces (JSONL egress, Prometheus endpoint)
//! - `infra/` - Infrastructure (Config, Metrics)

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use freight_tracker::domain::geo::GeoPoint;
use freight_tracker::domain::progress::ProgressMode;
use freight_tracker::domain::shipment::TrackingOptions;
use freight_tracker::infra::{Config, Metrics, ShipmentConfig};
use freight_tracker::io::Egress;
use freight_tracker::services::TrackingBoard;
use std::sync::Arc;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Freight tracker - shipment route and vessel position service
#[derive(Parser, Debug)]
#[command(name = "freight-tracker", version, about)]
struct Args {
    /// Path to TOML configuration file (default: $CONFIG_FILE or config/dev.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the tracking state for one shipment and print it as JSON
    Route {
        /// Port name or "lon,lat"
        #[arg(long, allow_hyphen_values = true)]
        origin: String,
        /// Port name or "lon,lat"
        #[arg(long, allow_hyphen_values = true)]
        destination: String,
        /// Progress in [0, 1] (default from config)
        #[arg(long)]
        progress: Option<f64>,
        #[arg(long, default_value = "ADHOC")]
        tracking_number: String,
        /// Progress interpolation (default from config)
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// List known ports
    Ports,
    /// Track configured shipments, write snapshots and serve metrics
    Serve,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Index,
    Distance,
}

impl From<ModeArg> for ProgressMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Index => ProgressMode::Index,
            ModeArg::Distance => ProgressMode::Distance,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `route` output stays machine readable.
    // Default: INFO, use RUST_LOG=debug for per-recompute events
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::new(Rfc3339))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(|| Config::resolve_config_path(&[]));
    let config = Config::load_from_path(&config_path);

    match args.command {
        Command::Route { origin, destination, progress, tracking_number, mode, pretty } => {
            let request = RouteRequest {
                origin,
                destination,
                progress: progress.unwrap_or(config.default_progress()),
                tracking_number,
                mode: mode.map(ProgressMode::from).unwrap_or(config.progress_mode()),
                pretty,
            };
            run_route(&config, request)
        }
        Command::Ports => {
            for name in config.ports().names() {
                if let Some(point) = config.ports().get(name) {
                    println!("{name:<16} {point}");
                }
            }
            Ok(())
        }
        Command::Serve => serve(config).await,
    }
}

struct RouteRequest {
    origin: String,
    destination: String,
    progress: f64,
    tracking_number: String,
    mode: ProgressMode,
    pretty: bool,
}

fn run_route(config: &Config, request: RouteRequest) -> anyhow::Result<()> {
    let origin = config
        .ports()
        .resolve(&request.origin)
        .with_context(|| format!("origin {}", request.origin))?;
    let destination = config
        .ports()
        .resolve(&request.destination)
        .with_context(|| format!("destination {}", request.destination))?;

    let options = TrackingOptions {
        progress_mode: request.mode,
        regional_waypoints: config.regional_waypoints(),
        ..TrackingOptions::default()
    };

    let board = TrackingBoard::new();
    let state =
        board.mount(&request.tracking_number, origin, destination, request.progress, &options)?;

    let json = if request.pretty {
        serde_json::to_string_pretty(&state)?
    } else {
        state.to_json()?
    };
    println!("{json}");
    Ok(())
}

/// A configured shipment with resolved endpoints
struct TrackedShipment {
    config: ShipmentConfig,
    origin: GeoPoint,
    destination: GeoPoint,
    options: TrackingOptions,
}

fn resolve_shipments(config: &Config) -> Vec<TrackedShipment> {
    let mut tracked = Vec::with_capacity(config.shipments().len());
    for shipment in config.shipments() {
        let endpoints = config
            .ports()
            .resolve(&shipment.origin)
            .and_then(|o| config.ports().resolve(&shipment.destination).map(|d| (o, d)));
        match endpoints {
            Ok((origin, destination)) => tracked.push(TrackedShipment {
                config: shipment.clone(),
                origin,
                destination,
                options: config.tracking_options(shipment),
            }),
            Err(e) => {
                warn!(
                    tracking_number = %shipment.tracking_number,
                    error = %e,
                    "shipment_skipped"
                );
            }
        }
    }
    tracked
}

/// Mount or recompute every shipment at the current time and egress the results
fn refresh(board: &TrackingBoard, egress: &Egress, shipments: &[TrackedShipment], fallback: f64) {
    let now = Utc::now();
    for shipment in shipments {
        let number = &shipment.config.tracking_number;
        let fraction = shipment.config.progress_at(now, fallback);

        let result = if board.contains(number) {
            board.update_progress(number, fraction)
        } else {
            board
                .mount(number, shipment.origin, shipment.destination, fraction, &shipment.options)
                .map(Some)
        };

        // the board already logged rejected input
        if let Ok(Some(state)) = result {
            egress.write_state(&state);
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!(
        git_hash = env!("GIT_HASH"),
        config_file = %config.config_file(),
        site = %config.site_id(),
        shipments = %config.shipments().len(),
        progress_mode = %config.progress_mode().as_str(),
        refresh_interval_secs = %config.refresh_interval_secs(),
        prometheus_port = %config.prometheus_port(),
        egress_file = %config.egress_file(),
        "freight_tracker_starting"
    );

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let metrics = Arc::new(Metrics::new());
    let board = Arc::new(TrackingBoard::with_metrics(metrics.clone()));
    let egress = Egress::new(config.egress_file()).with_metrics(metrics.clone());

    let shipments = resolve_shipments(&config);
    if shipments.is_empty() {
        warn!("no_shipments_configured");
    }

    // Start Prometheus metrics HTTP server (if port > 0)
    let prometheus_port = config.prometheus_port();
    if prometheus_port > 0 {
        let prom_metrics = metrics.clone();
        let prom_board = board.clone();
        let site_id = config.site_id().to_string();
        let prom_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = freight_tracker::io::prometheus::start_metrics_server(
                prometheus_port,
                prom_metrics,
                prom_board,
                site_id,
                prom_shutdown,
            )
            .await
            {
                tracing::error!(error = %e, "prometheus_server_error");
            }
        });
    }

    // Start metrics reporter
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs().max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    let mut interval =
        tokio::time::interval(Duration::from_secs(config.refresh_interval_secs().max(1)));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                refresh(&board, &egress, &shipments, config.default_progress());
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    board.clear();
    info!("freight_tracker_shutdown_complete");
    Ok(())
}
