//! `run` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use batch_writer::{create_writer, CancellationToken, EnqueueError, Producer};
use observability::RunningStats;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::report::RunReport;

/// How often writer gauges are pushed to the metrics facade
const PUBLISH_INTERVAL: Duration = Duration::from_secs(1);

/// Synthetic record produced by the load generator
#[derive(Debug, Clone, Serialize)]
pub struct LoadRecord {
    pub producer: usize,
    pub seq: u64,
    pub payload: String,
}

/// What one producer task did
#[derive(Debug, Default)]
struct ProducerOutcome {
    sent: u64,
    latency_us: RunningStats,
}

/// Execute the `run` command
pub async fn run_load(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .map_err(CliError::from)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if let Some(capacity) = args.capacity {
        info!(capacity, "Overriding batch capacity from CLI");
        config.capacity = capacity;
    }
    if let Some(interval_ms) = args.flush_interval_ms {
        info!(interval_ms, "Overriding flush interval from CLI");
        config.flush_interval_ms = interval_ms;
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port).map_err(CliError::Metrics)?;
    }

    let writer = create_writer::<LoadRecord>(&config).map_err(CliError::from)?;

    info!(
        writer = %config.name,
        capacity = config.capacity,
        flush_interval_ms = config.flush_interval_ms,
        sink = %config.sink.name,
        producers = args.producers,
        records = args.records,
        "Writer started"
    );

    let stop = CancellationToken::new();
    let watcher = tokio::spawn(watch_for_stop(stop.clone(), args.duration_secs));

    let started = Instant::now();
    let mut producers = JoinSet::new();
    for id in 0..args.producers {
        producers.spawn(produce(id, args.records, writer.producer(), stop.clone()));
    }

    let mut sent = 0u64;
    let mut latency = RunningStats::default();
    let mut publish = tokio::time::interval(PUBLISH_INTERVAL);

    loop {
        tokio::select! {
            joined = producers.join_next() => match joined {
                Some(Ok(outcome)) => {
                    sent += outcome.sent;
                    latency.merge(&outcome.latency_us);
                }
                Some(Err(e)) => error!(error = %e, "Producer task failed"),
                None => break,
            },
            _ = publish.tick() => writer.publish_metrics(),
        }
    }

    // Releases the watcher when producers finished on their own
    stop.cancel();
    if let Err(e) = watcher.await {
        warn!(error = %e, "Shutdown watcher task failed");
    }

    writer.publish_metrics();
    let name = writer.name().to_string();
    let metrics = writer.metrics().clone();
    writer.stop().await;

    let snapshot = metrics.snapshot();
    observability::record_writer_state(&name, &observability::WriterGauges::from(&snapshot));

    let report = RunReport::new(
        &name,
        args.producers,
        sent,
        started.elapsed(),
        &latency,
        snapshot,
    );

    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize run report")?;
        println!("{}", json);
    } else {
        report.print_summary();
    }

    info!(writer = %name, "batchwriter finished");
    Ok(())
}

/// Enqueue `records` records (0 = until stopped), timing each enqueue
async fn produce(
    id: usize,
    records: u64,
    producer: Producer<LoadRecord>,
    stop: CancellationToken,
) -> ProducerOutcome {
    let mut outcome = ProducerOutcome::default();
    let mut seq = 0u64;

    while records == 0 || seq < records {
        let record = LoadRecord {
            producer: id,
            seq,
            payload: format!("producer-{id}-record-{seq}"),
        };

        let begin = Instant::now();
        match producer.enqueue_with_cancel(&stop, record).await {
            Ok(()) => {}
            Err(EnqueueError::Cancelled) => break,
            Err(EnqueueError::Closed) => {
                warn!(producer = id, "Writer closed while producing");
                break;
            }
        }
        outcome.latency_us.push(begin.elapsed().as_secs_f64() * 1_000_000.0);
        outcome.sent += 1;
        seq += 1;
    }

    debug!(producer = id, sent = outcome.sent, "Producer finished");
    outcome
}

/// Cancel `stop` on Ctrl+C, SIGTERM or after `duration_secs` (0 = never)
async fn watch_for_stop(stop: CancellationToken, duration_secs: u64) {
    let deadline = async {
        if duration_secs == 0 {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(Duration::from_secs(duration_secs)).await;
    };

    tokio::select! {
        _ = shutdown_signal() => warn!("Received shutdown signal, stopping producers..."),
        _ = deadline => info!(duration_secs, "Run duration elapsed"),
        _ = stop.cancelled() => return,
    }
    stop.cancel();
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
