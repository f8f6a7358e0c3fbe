//! trackcast service binary.
//!
//! Wires the tracker to a demo transport: measurement JSON lines are read
//! from stdin, published reports are written to the log. A real deployment
//! replaces both bridges with its broker of choice; the service itself only
//! sees an `mpsc` source and a [`ReportPublisher`] sink.

use std::sync::Arc;

use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use trackcast::config::TrackerConfig;
use trackcast::service::{BroadcastPublisher, TrackerService};

#[derive(Parser, Debug)]
#[command(name = "trackcast", about = "Real-time multi-target tracker", version)]
struct Args {
    /// Worker tick period in milliseconds
    #[arg(long, default_value = "100")]
    interval_ms: u64,

    /// TCP port of the health probe
    #[arg(long, default_value = "8899")]
    health_port: u16,

    /// Association gate distance in metres
    #[arg(long, default_value = "10.0")]
    association_gate: f64,

    /// New-track gate (duplicate suppression / clustering) distance in metres
    #[arg(long, default_value = "5.0")]
    new_track_gate: f64,

    /// Hits required to confirm a track
    #[arg(long, default_value = "3")]
    confirmation_hits: u32,

    /// Consecutive misses after which a track is deleted (exclusive)
    #[arg(long, default_value = "5")]
    max_misses: u32,
}

#[tokio::main]
async fn main() -> trackcast::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = TrackerConfig::builder()
        .worker_interval_ms(args.interval_ms)
        .health_port(args.health_port)
        .association_gate_distance(args.association_gate)
        .new_track_gate_distance(args.new_track_gate)
        .confirmation_hits(args.confirmation_hits)
        .max_misses_to_delete(args.max_misses)
        .build();

    let publisher = Arc::new(BroadcastPublisher::new(64));

    // Drain published reports into the log.
    let mut reports = publisher.subscribe();
    tokio::spawn(async move {
        loop {
            match reports.recv().await {
                Ok(report) => info!(%report, "track report"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "report reader lagged")
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Bridge stdin lines onto the measurement channel.
    let (measurements, source) = mpsc::channel(1024);
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if measurements.send(line).await.is_err() {
                break;
            }
        }
    });

    let mut service = TrackerService::new(config, publisher);
    service.start(source).await?;
    info!("trackcast running; send measurement JSON on stdin, Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    service.stop().await;
    Ok(())
}
