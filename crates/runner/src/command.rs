// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution with timeout and process-group cancellation.
//!
//! The child runs in its own process group so cancellation reaches any
//! grandchildren it spawned: SIGTERM to the group, then SIGKILL after a
//! grace period.

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use serde_json::{Map, Value};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

/// SIGTERM to SIGKILL escalation window.
pub const KILL_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command argv is empty")]
    EmptyArgv,
    #[error("failed to spawn {argv:?}: {source}")]
    Spawn {
        argv: Vec<String>,
        #[source]
        source: std::io::Error,
    },
    #[error("io error while waiting for child: {0}")]
    Io(#[from] std::io::Error),
}

/// What a finished (or killed) subprocess produced.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// `{args, stdout, stderr, returncode}`, captured raw
    pub results: Map<String, Value>,
    pub returncode: i64,
    pub timed_out: bool,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.returncode == 0
    }
}

/// Spawn `argv` and wait up to `timeout` for it to finish.
///
/// stdout and stderr are captured as raw strings, never evaluated. On
/// timeout the process group gets SIGTERM, then SIGKILL after
/// [`KILL_GRACE`].
pub async fn execute_command(
    argv: &[String],
    timeout: Duration,
) -> Result<CommandOutcome, CommandError> {
    let (program, args) = argv.split_first().ok_or(CommandError::EmptyArgv)?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CommandError::Spawn {
            argv: argv.to_vec(),
            source,
        })?;

    // Drain pipes concurrently so a chatty child cannot block on a full
    // pipe while we wait for it.
    let stdout_task = tokio::spawn(read_pipe(child.stdout.take()));
    let stderr_task = tokio::spawn(read_pipe(child.stderr.take()));

    let (timed_out, status) = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => (false, Some(status?)),
        Err(_) => {
            terminate_group(&mut child).await;
            (true, child.try_wait()?)
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();
    let returncode = status.and_then(|s| s.code()).map(i64::from).unwrap_or(-1);

    let mut results = Map::new();
    results.insert(
        "args".to_string(),
        Value::Array(argv.iter().cloned().map(Value::String).collect()),
    );
    results.insert("stdout".to_string(), Value::String(stdout));
    results.insert("stderr".to_string(), Value::String(stderr));
    results.insert("returncode".to_string(), Value::from(returncode));

    Ok(CommandOutcome {
        results,
        returncode,
        timed_out,
    })
}

async fn read_pipe<R: tokio::io::AsyncRead + Unpin + Send + 'static>(pipe: Option<R>) -> String {
    let Some(mut pipe) = pipe else {
        return String::new();
    };
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

/// SIGTERM the child's process group, escalate to SIGKILL after the grace
/// period.
async fn terminate_group(child: &mut Child) {
    let Some(pid) = child.id() else {
        return; // already reaped
    };
    let group = Pid::from_raw(pid as i32);

    if let Err(e) = killpg(group, Signal::SIGTERM) {
        tracing::debug!(pid, error = %e, "SIGTERM to process group failed");
    }

    if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_err() {
        tracing::warn!(pid, "process survived SIGTERM, sending SIGKILL");
        if let Err(e) = killpg(group, Signal::SIGKILL) {
            tracing::debug!(pid, error = %e, "SIGKILL to process group failed");
        }
        let _ = child.wait().await;
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
