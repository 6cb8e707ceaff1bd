// src/bin/leaky-gate.rs

// HTTP service exposing a single global leaky bucket

// dependencies
use std::error::Error as StdError;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser};
use humantime::parse_duration;
use leaky_gate::server::{self, AppState};
use leaky_gate::telemetry::init_tracing;
use leaky_gate::{Clock, LeakyBucketConfig, LimiterHandle, Result, SystemClock};
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Leaky bucket admission control over HTTP", long_about = None)]
struct Cli {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Address to bind.
    #[arg(long, env = "LEAKY_GATE_BIND", default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Initial bucket capacity.
    #[arg(long, env = "LEAKY_GATE_CAPACITY", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    capacity: u64,

    /// Initial leak interval (e.g. "1s", "250ms").
    #[arg(long, env = "LEAKY_GATE_RATE", default_value = "1s", value_parser = parse_leak_interval)]
    rate: Duration,

    /// Explicit log filter (e.g. "leaky_gate=debug").
    #[arg(long, value_name = "FILTER")]
    log_filter: Option<String>,

    /// Emit JSON logs (requires `--features json-logs`).
    #[arg(long, action = ArgAction::SetTrue)]
    json_logs: bool,
}

fn parse_leak_interval(raw: &str) -> std::result::Result<Duration, String> {
    let interval = parse_duration(raw).map_err(|err| err.to_string())?;
    if interval.is_zero() {
        return Err("leak interval must be positive".to_string());
    }
    Ok(interval)
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            std::process::ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.log_filter.as_deref(), cli.json_logs)?;

    let capacity = usize::try_from(cli.capacity).unwrap_or(usize::MAX);
    let config = LeakyBucketConfig::new(capacity, cli.rate);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let limiter = Arc::new(LimiterHandle::with_clock(config, Arc::clone(&clock))?);
    info!(capacity, leak_interval = ?cli.rate, "leaky bucket ready");

    let listener = TcpListener::bind(SocketAddr::new(cli.bind, cli.port)).await?;
    let state = AppState::new(Arc::clone(&limiter), clock);
    server::serve(listener, state, shutdown_signal()).await?;

    limiter.shutdown().await;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            // without a signal handler, keep serving until the process is killed
            error!(error = %err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

fn report_error(err: &leaky_gate::Error) {
    error!(error = %err, "fatal error");
    eprintln!("error: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}
