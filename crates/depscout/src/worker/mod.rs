//! Isolated dynamic probing.
//!
//! Imports built at runtime (`require('./drivers/' + name)`) are invisible to
//! the static scanner. The worker runs such a module in a separate `node`
//! process whose module loader reports every request it receives, so the
//! analyzer's own process never executes foreign code.
//!
//! A probe is bounded by a wall-clock timeout. On expiry the child is killed
//! and reaped before [`WorkerFailure::Timeout`] is returned. On unix the child
//! leads its own process group, and the group is killed on timeout and after
//! a normal exit so processes the module spawned do not outlive the probe.

pub mod protocol;

use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, warn};

use crate::config::DEFAULT_NODE_BINARY;
use crate::error::AnalyzeError;

use self::protocol::{FailureKind, ProbeMessage, parse_stderr_line, parse_stdout_line};

/// Loader instrumentation passed to `node -e`.
const HARNESS: &str = include_str!("harness.js");

/// Non-protocol stderr lines kept for error messages.
const STDERR_TAIL_LINES: usize = 20;

/// How long to wait for the output pipes to drain after the child exited.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Why a probe produced no specifier set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerFailure {
    /// Uncaught exception with a non-falsey value
    Thrown { message: String },
    /// Uncaught `throw undefined`, `throw null`, `throw false` and the like
    FalseyThrow { message: String },
    /// Recursion exhausted the call stack
    StackOverflow { message: String },
    /// The module failed to parse at load time
    Syntax { message: String },
    /// The module did not finish its first turn in time
    Timeout { timeout: Duration },
    /// `node` could not be started
    Spawn { message: String },
}

impl WorkerFailure {
    fn from_protocol(kind: FailureKind, message: String) -> Self {
        match kind {
            FailureKind::Thrown => WorkerFailure::Thrown { message },
            FailureKind::Falsey => WorkerFailure::FalseyThrow { message },
            FailureKind::StackOverflow => WorkerFailure::StackOverflow { message },
            FailureKind::Syntax => WorkerFailure::Syntax { message },
        }
    }

    /// Attach the probed module's path.
    pub fn into_error(self, path: &Path) -> AnalyzeError {
        let path = path.to_path_buf();
        match self {
            WorkerFailure::Thrown { message } => AnalyzeError::WorkerThrown { path, message },
            WorkerFailure::FalseyThrow { message } => {
                AnalyzeError::WorkerFalseyThrow { path, message }
            }
            WorkerFailure::StackOverflow { message } => {
                AnalyzeError::WorkerStackOverflow { path, message }
            }
            WorkerFailure::Syntax { message } => AnalyzeError::WorkerSyntax { path, message },
            WorkerFailure::Timeout { timeout } => AnalyzeError::WorkerTimeout {
                path,
                timeout_ms: timeout.as_millis() as u64,
            },
            WorkerFailure::Spawn { message } => AnalyzeError::WorkerSpawn { path, message },
        }
    }
}

/// Terminal outcome of one probe: every distinct specifier requested, or why
/// the module could not be observed.
pub type WorkerResult = Result<BTreeSet<String>, WorkerFailure>;

/// Runs modules under the instrumented loader.
#[derive(Debug, Clone)]
pub struct ProbeWorker {
    node_binary: PathBuf,
}

impl Default for ProbeWorker {
    fn default() -> Self {
        Self::new(DEFAULT_NODE_BINARY)
    }
}

impl ProbeWorker {
    pub fn new(node_binary: impl Into<PathBuf>) -> Self {
        Self {
            node_binary: node_binary.into(),
        }
    }

    /// Execute `module` and collect the specifiers it requests.
    pub async fn probe(&self, module: &Path, timeout: Duration) -> WorkerResult {
        let deadline = Instant::now() + timeout;
        debug!(module = %module.display(), ?timeout, "probing module");

        let mut command = Command::new(&self.node_binary);
        command
            .arg("-e")
            .arg(HARNESS)
            .arg(module)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = module.parent() {
            command.current_dir(dir);
        }
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| WorkerFailure::Spawn {
            message: format!("{}: {e}", self.node_binary.display()),
        })?;
        let pgid = child.id();

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(BufReader::new(stdout), tx.clone(), |line| {
                parse_stdout_line(line)
            }));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(BufReader::new(stderr), tx.clone(), |line| {
                Some(parse_stderr_line(line))
            }));
        }
        drop(tx);

        let status = tokio::select! {
            status = child.wait() => status.map_err(|e| WorkerFailure::Spawn {
                message: format!("failed waiting for probe process: {e}"),
            })?,
            _ = sleep(timeout) => {
                if let Some(pgid) = pgid {
                    kill_process_group(pgid).await;
                }
                // kill() also waits, so no zombie is left behind
                if let Err(e) = child.kill().await {
                    warn!(module = %module.display(), error = %e, "failed to kill timed-out probe");
                }
                debug!(module = %module.display(), "probe timed out");
                return Err(WorkerFailure::Timeout { timeout });
            }
        };
        if let Some(pgid) = pgid {
            kill_process_group(pgid).await;
        }

        let mut messages = Vec::new();
        let drain_deadline = deadline.max(Instant::now()) + DRAIN_GRACE;
        while let Ok(Some(message)) = timeout_at(drain_deadline, rx.recv()).await {
            messages.push(message);
        }

        let result = interpret(status, messages);
        match &result {
            Ok(specifiers) => debug!(
                module = %module.display(),
                count = specifiers.len(),
                "probe finished"
            ),
            Err(failure) => debug!(module = %module.display(), ?failure, "probe failed"),
        }
        result
    }
}

/// SIGKILL every process left in the probe's group. A group that is already
/// empty makes `kill` fail, which is fine.
#[cfg(unix)]
async fn kill_process_group(pgid: u32) {
    let result = Command::new("kill")
        .arg("-KILL")
        .arg("--")
        .arg(format!("-{pgid}"))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if let Err(e) = result {
        warn!(pgid, error = %e, "failed to signal probe process group");
    }
}

#[cfg(not(unix))]
async fn kill_process_group(_pgid: u32) {}

async fn forward_lines<R, F>(reader: R, tx: mpsc::UnboundedSender<ProbeMessage>, decode: F)
where
    R: AsyncBufRead + Unpin,
    F: Fn(&str) -> Option<ProbeMessage>,
{
    let mut lines = reader.lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(message) = decode(&line) {
            if tx.send(message).is_err() {
                break;
            }
        }
    }
}

/// Turn the exit status and decoded output into a terminal result.
fn interpret(status: ExitStatus, messages: Vec<ProbeMessage>) -> WorkerResult {
    let mut specifiers = BTreeSet::new();
    let mut failure = None;
    let mut stderr_tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

    for message in messages {
        match message {
            ProbeMessage::Load(specifier) => {
                specifiers.insert(specifier);
            }
            ProbeMessage::Failed { kind, message } => {
                failure.get_or_insert_with(|| WorkerFailure::from_protocol(kind, message));
            }
            ProbeMessage::Stderr(line) => {
                if stderr_tail.len() == STDERR_TAIL_LINES {
                    stderr_tail.pop_front();
                }
                stderr_tail.push_back(line);
            }
        }
    }

    if let Some(failure) = failure {
        return Err(failure);
    }

    if !status.success() {
        let tail: Vec<String> = stderr_tail.into_iter().collect();
        let message = if tail.is_empty() {
            format!("probe process exited with {status}")
        } else {
            tail.join("\n")
        };
        return Err(WorkerFailure::Thrown { message });
    }

    Ok(specifiers)
}
