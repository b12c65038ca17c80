// src/exec/task_runner.rs

//! Single attempt process runner.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backend::{AttemptOutcome, AttemptRequest};

/// How long to keep collecting output once the process is gone. A killed
/// shell can leave children holding the pipes open.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(500);

enum Exit {
    Status(std::process::ExitStatus),
    TimedOut,
    Cancelled,
}

/// Run `request.command` once under its timeout.
///
/// Standard output and standard error are merged line by line in arrival
/// order; bytes that are not UTF-8 are replaced, never fatal. On timeout or
/// cancellation the child and, on unix, its whole process group are killed
/// before returning.
pub async fn run_command(
    request: &AttemptRequest,
    cancel: &CancellationToken,
) -> Result<AttemptOutcome> {
    info!(
        workflow = %request.workflow,
        task = %request.task,
        attempt = request.attempt,
        cmd = %request.command,
        "starting task process"
    );

    let mut cmd = shell_command(&request.command);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for task '{}'", request.task))?;

    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    if let Some(stdout) = child.stdout.take() {
        forward_lines(stdout, line_tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(stderr, line_tx.clone());
    }
    drop(line_tx);

    let exit = tokio::select! {
        status = child.wait() => Exit::Status(status.with_context(|| {
            format!("waiting for process of task '{}'", request.task)
        })?),
        _ = tokio::time::sleep(request.timeout) => Exit::TimedOut,
        _ = cancel.cancelled() => Exit::Cancelled,
    };

    if !matches!(exit, Exit::Status(_)) {
        kill_process_tree(&mut child, request).await;
    }

    let output = drain_output(&mut line_rx).await;

    let outcome = match exit {
        Exit::Status(status) if status.success() => AttemptOutcome::Success { output },
        Exit::Status(status) => AttemptOutcome::Failed {
            code: status.code().unwrap_or(-1),
            output,
        },
        Exit::TimedOut => AttemptOutcome::TimedOut { output },
        Exit::Cancelled => AttemptOutcome::Cancelled { output },
    };

    debug!(
        task = %request.task,
        attempt = request.attempt,
        outcome = outcome_label(&outcome),
        "task process finished"
    );
    Ok(outcome)
}

#[cfg(not(unix))]
fn shell_command(command: &str) -> Command {
    let mut c = Command::new("cmd");
    c.arg("/C").arg(command);
    c
}

/// The shell leads its own process group so a kill reaches everything it
/// started.
#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut c = Command::new("sh");
    c.arg("-c").arg(command).process_group(0);
    c
}

async fn kill_process_tree(child: &mut Child, request: &AttemptRequest) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
                debug!(task = %request.task, pid, error = %e, "failed to signal process group");
            }
        }
    }

    if let Err(e) = child.kill().await {
        warn!(
            task = %request.task,
            attempt = request.attempt,
            error = %e,
            "failed to kill task process"
        );
    }
}

fn forward_lines<R>(stream: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(trim_line_ending(&buf)).into_owned();
                    // Keep reading after the receiver is gone; closing the
                    // pipe early would SIGPIPE the child.
                    let _ = tx.send(line);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!(error = %e, "task output unreadable; discarding the rest");
                    let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
                    break;
                }
            }
        }
    });
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

async fn drain_output(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    let deadline = Instant::now() + OUTPUT_DRAIN_GRACE;
    let mut output = String::new();

    while let Ok(Some(line)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        output.push_str(&line);
        output.push('\n');
    }

    output
}

fn outcome_label(outcome: &AttemptOutcome) -> &'static str {
    match outcome {
        AttemptOutcome::Success { .. } => "success",
        AttemptOutcome::Failed { .. } => "failed",
        AttemptOutcome::TimedOut { .. } => "timeout",
        AttemptOutcome::Cancelled { .. } => "cancelled",
    }
}
