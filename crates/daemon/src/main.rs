// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! milld: the transfer and audit maintenance daemons.
//!
//! Exit codes: 0 on graceful shutdown, 1 on misconfiguration, 2 on
//! unrecoverable backend failure.

use anyhow::Context;
use clap::Parser;
use mill_client::{BucketClient, ResultsClient};
use mill_core::SystemClock;
use mill_daemon::{AuditConfig, AuditDaemon, TransferConfig, TransferDaemon};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Transfer,
    Audit,
    Both,
}

fn parse_mode(raw: &str) -> Result<Mode, String> {
    match raw {
        "transfer" => Ok(Mode::Transfer),
        "audit" => Ok(Mode::Audit),
        "both" => Ok(Mode::Both),
        other => Err(format!("{other:?} is not one of: transfer, audit, both")),
    }
}

#[derive(Parser, Debug)]
#[command(name = "milld", about = "Transfer and audit maintenance daemons")]
struct Args {
    /// Which daemons to run
    #[arg(long, default_value = "both", value_parser = parse_mode)]
    mode: Mode,
    /// Pipelines to maintain (repeatable)
    #[arg(long = "pipeline", required = true)]
    pipelines: Vec<String>,
    /// Transfer cycle period in seconds
    #[arg(long, default_value_t = 30)]
    period: u64,
    /// Terminal items per pipeline and site per transfer cycle
    #[arg(long, default_value_t = 50)]
    batch: usize,
    /// Audit buffer in seconds
    #[arg(long, default_value_t = 3_600)]
    buffer: u64,
    /// Workspace locator (path, URL, or name); defaults to the active one
    #[arg(long)]
    workspace: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
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

    match run(args).await {
        Ok(()) => {
            info!("graceful shutdown");
            ExitCode::SUCCESS
        }
        Err(Failure::Misconfigured(e)) => {
            error!("misconfiguration: {e:#}");
            ExitCode::from(1)
        }
        Err(Failure::Backend(e)) => {
            error!("unrecoverable backend failure: {e}");
            ExitCode::from(2)
        }
    }
}

enum Failure {
    Misconfigured(anyhow::Error),
    Backend(mill_daemon::DaemonError),
}

async fn run(args: Args) -> Result<(), Failure> {
    let workspace = match &args.workspace {
        Some(locator) => mill_workspace::resolve(locator)
            .await
            .with_context(|| format!("resolving workspace {locator:?}"))
            .map_err(Failure::Misconfigured)?,
        None => mill_workspace::load_active()
            .context("loading active workspace")
            .map_err(Failure::Misconfigured)?,
    };

    let bucket = Arc::new(
        BucketClient::new(&workspace)
            .context("configuring bucket client")
            .map_err(Failure::Misconfigured)?,
    );

    let shutdown_transfer = Arc::new(Notify::new());
    let shutdown_audit = Arc::new(Notify::new());
    spawn_signal_task(vec![
        Arc::clone(&shutdown_transfer),
        Arc::clone(&shutdown_audit),
    ]);

    let mut tasks = tokio::task::JoinSet::new();

    if matches!(args.mode, Mode::Transfer | Mode::Both) {
        let results = Arc::new(
            ResultsClient::new(&workspace)
                .context("configuring results client")
                .map_err(Failure::Misconfigured)?,
        );
        let mut config = TransferConfig::new(args.pipelines.clone());
        config.period = Duration::from_secs(args.period);
        config.batch = args.batch;
        let daemon = TransferDaemon::new(
            Arc::clone(&bucket),
            results,
            workspace.clone(),
            config,
        );
        let shutdown = Arc::clone(&shutdown_transfer);
        tasks.spawn(async move { daemon.run(shutdown).await });
    }

    if matches!(args.mode, Mode::Audit | Mode::Both) {
        let mut config = AuditConfig::new(args.pipelines.clone());
        config.buffer = Duration::from_secs(args.buffer);
        let daemon = AuditDaemon::new(
            Arc::clone(&bucket),
            Arc::new(SystemClock),
            config,
        );
        let shutdown = Arc::clone(&shutdown_audit);
        tasks.spawn(async move { daemon.run(shutdown).await });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                // One daemon hit an unrecoverable backend error; stop the rest.
                shutdown_transfer.notify_one();
                shutdown_audit.notify_one();
                while tasks.join_next().await.is_some() {}
                return Err(Failure::Backend(e));
            }
            Err(join_error) => {
                return Err(Failure::Misconfigured(anyhow::anyhow!(
                    "daemon task panicked: {join_error}"
                )));
            }
        }
    }
    Ok(())
}

fn spawn_signal_task(targets: Vec<Arc<Notify>>) {
    tokio::spawn(async move {
        let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
            return;
        };
        let Ok(mut sigint) = signal(SignalKind::interrupt()) else {
            return;
        };
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, stopping"),
            _ = sigint.recv() => info!("received SIGINT, stopping"),
        }
        for target in targets {
            target.notify_one();
        }
    });
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (milld.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

fn log_path() -> Option<std::path::PathBuf> {
    dirs::home_dir().map(|home| home.join(".mill").join("milld.log"))
}

/// Rotate the daemon log if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `milld.log` to `milld.log.1` to `.2` to `.3`, deleting the
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
