// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! millrun: long-lived worker that withdraws and executes work for one
//! pipeline.
//!
//! Exit codes: 0 on graceful shutdown, 1 on misconfiguration, 2 on
//! unrecoverable backend failure.

use anyhow::Context;
use clap::Parser;
use mill_client::BucketClient;
use mill_core::{SystemClock, WithdrawFilter};
use mill_runner::{ArgSource, Registry, Runner, RunnerConfig};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "millrun", about = "Withdraws and executes work for one pipeline")]
struct Args {
    /// Pipeline to withdraw work from
    #[arg(long)]
    pipeline: String,
    /// Restrict withdrawals to a site
    #[arg(long)]
    site: Option<String>,
    /// Restrict withdrawals to a user
    #[arg(long)]
    user: Option<String>,
    /// Restrict withdrawals to an event number
    #[arg(long)]
    event: Option<i64>,
    /// Require all of these tags (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// Iterations before exiting; 0 runs forever
    #[arg(long, default_value_t = 0)]
    lifetime: u64,
    /// Seconds to sleep when the queue is empty
    #[arg(long, default_value_t = 5)]
    sleep: u64,
    /// What registered functions receive: "parameters" or "work"
    #[arg(long, default_value = "parameters", value_parser = parse_arg_source)]
    arg_source: ArgSource,
    /// Workspace locator (path, URL, or name); defaults to the active one
    #[arg(long)]
    workspace: Option<String>,
}

fn parse_arg_source(raw: &str) -> Result<ArgSource, String> {
    match raw {
        "parameters" => Ok(ArgSource::Parameters),
        "work" => Ok(ArgSource::Work),
        other => Err(format!("{other:?} is not one of: parameters, work")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Let clap print help/version normally; anything else is a
            // misconfiguration.
            let _ = e.print();
            return match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    ExitCode::SUCCESS
                }
                _ => ExitCode::from(1),
            };
        }
    };

    let _log_guard = match setup_logging() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: failed to set up logging: {e}");
            return ExitCode::from(1);
        }
    };

    let runner = match build(&args).await {
        Ok(runner) => runner,
        Err(e) => {
            error!("misconfiguration: {e:#}");
            return ExitCode::from(1);
        }
    };

    let shutdown = runner.shutdown_handle();
    tokio::spawn(async move {
        let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
            return;
        };
        let Ok(mut sigint) = signal(SignalKind::interrupt()) else {
            return;
        };
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, stopping after current work"),
            _ = sigint.recv() => info!("received SIGINT, stopping after current work"),
        }
        shutdown.notify_one();
    });

    match runner.run().await {
        Ok(summary) => {
            info!(
                executed = summary.executed,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "graceful shutdown"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("unrecoverable backend failure: {e}");
            ExitCode::from(2)
        }
    }
}

async fn build(args: &Args) -> anyhow::Result<Runner<BucketClient>> {
    let workspace = match &args.workspace {
        Some(locator) => mill_workspace::resolve(locator)
            .await
            .with_context(|| format!("resolving workspace {locator:?}"))?,
        None => mill_workspace::load_active().context("loading active workspace")?,
    };

    let bucket = BucketClient::new(&workspace).context("configuring bucket client")?;

    let config = RunnerConfig {
        pipeline: args.pipeline.clone(),
        filter: WithdrawFilter {
            event: args.event,
            site: args.site.clone(),
            user: args.user.clone(),
            tags: args.tags.clone(),
            ..Default::default()
        },
        lifetime: args.lifetime,
        sleep: Duration::from_secs(args.sleep),
        arg_source: args.arg_source,
    };

    Ok(Runner::new(
        Arc::new(bucket),
        Arc::new(Registry::new()),
        config,
        Arc::new(SystemClock),
    ))
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (millrun.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

fn log_path() -> Option<std::path::PathBuf> {
    dirs::home_dir().map(|home| home.join(".mill").join("millrun.log"))
}

/// Rotate the runner log if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `millrun.log` to `millrun.log.1` to `.2` to `.3`, deleting the
/// oldest. Best-effort: rotation failures never block startup.
fn rotate_log_if_needed(path: &std::path::Path) {
    let size = match std::fs::metadata(path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }
    let base = path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let _ = std::fs::rename(format!("{base}.{i}"), format!("{base}.{}", i + 1));
    }
    let _ = std::fs::rename(path, format!("{base}.1"));
}

fn setup_logging() -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let path = log_path()
        .ok_or_else(|| std::io::Error::other("home directory could not be determined"))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    rotate_log_if_needed(&path);

    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::other("log path has no parent"))?;
    let name = path
        .file_name()
        .ok_or_else(|| std::io::Error::other("log path has no file name"))?;
    let appender = tracing_appender::rolling::never(dir, name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
