#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Child process plumbing: spawn, feed stdin, drain both pipes, enforce a
//! deadline.

use std::{
    ffi::{OsStr, OsString},
    path::Path,
    process::Stdio,
    time::Duration,
};

use anyhow::Context;
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, BufReader},
    process::{Child, Command},
    task::JoinHandle,
    time::timeout,
};

/// How long pipes may stay open after the child exits, e.g. held by a
/// background process it started.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Failures while running a child process.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The program could not be started at all.
    #[error("failed to spawn `{program}`")]
    Spawn {
        /// Program that was being launched.
        program: String,
        /// Underlying OS error.
        #[source]
        source:  std::io::Error,
    },

    /// The deadline passed before the process exited; it has been killed.
    #[error("subprocess timed out after {0:?}")]
    TimedOut(Duration),

    /// Reading the pipes or waiting on the child failed.
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// Drop guard that terminates a spawned child process, and every process
/// in its group, if callers forget to await it.
struct ChildDropGuard {
    /// The child, until disarmed.
    child: Option<Child>,
    /// Process group led by the child.
    group: Option<u32>,
}

impl ChildDropGuard {
    /// Wraps the provided child process with the drop guard.
    fn new(child: Child) -> Self {
        let group = child.id();
        Self {
            child: Some(child),
            group,
        }
    }

    /// Returns a mutable reference to the underlying child process.
    fn child_mut(&mut self) -> anyhow::Result<&mut Child> {
        self.child
            .as_mut()
            .context("child process already taken from guard")
    }

    /// Kills whatever is left in the child's process group.
    #[cfg(unix)]
    fn kill_group(&self) {
        if let Some(pgid) = self.group.and_then(|id| libc::pid_t::try_from(id).ok()) {
            // SAFETY: killpg only sends a signal; an empty group yields ESRCH.
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }

    /// Kills whatever is left in the child's process group.
    #[cfg(not(unix))]
    fn kill_group(&self) {}

    /// Prevents the guard from killing the process on drop.
    fn disarm(mut self) {
        self.child = None;
    }
}

impl Drop for ChildDropGuard {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
            self.kill_group();
        }
    }
}

/// Waits for a pipe reader, giving up [`DRAIN_GRACE`] after the child has
/// exited. A pipe still held open by a descendant yields empty output.
async fn drain(
    mut task: JoinHandle<anyhow::Result<Vec<u8>>>,
    stream: &str,
) -> anyhow::Result<Vec<u8>> {
    match timeout(DRAIN_GRACE, &mut task).await {
        Ok(joined) => joined.with_context(|| format!("{stream} task join error"))?,
        Err(_) => {
            task.abort();
            tracing::warn!(stream, "pipe still open after the process exited; output dropped");
            Ok(Vec::new())
        }
    }
}

/// Captured result of a finished subprocess.
#[derive(Debug)]
pub struct Collected {
    /// Exit status returned by the process.
    pub status:  std::process::ExitStatus,
    /// Contents written to stdout.
    pub stdout:  Vec<u8>,
    /// Contents written to stderr.
    pub stderr:  Vec<u8>,
    /// Wall-clock time between spawn and exit.
    pub elapsed: Duration,
}

/// Describes how stdin should be wired for the spawned process.
#[derive(Debug, Clone)]
pub enum StdinSource {
    /// Attach nothing to stdin.
    Null,
    /// Write the provided bytes, then close stdin.
    Bytes(Vec<u8>),
}

/// Spawns a command, optionally feeds stdin, and collects stdout/stderr.
///
/// The child leads its own process group; anything still running in that
/// group once the child exits is killed. When `deadline` elapses the child
/// and its group are killed and [`ProcessError::TimedOut`] is returned.
pub async fn run_collect(
    program: impl AsRef<OsStr>,
    args: &[OsString],
    stdin: StdinSource,
    cwd: Option<&Path>,
    env: &[(OsString, OsString)],
    deadline: Option<Duration>,
) -> Result<Collected, ProcessError> {
    let program = program.as_ref();
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    match &stdin {
        StdinSource::Null => {
            cmd.stdin(Stdio::null());
        }
        StdinSource::Bytes(_) => {
            cmd.stdin(Stdio::piped());
        }
    }

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    for (key, value) in env {
        cmd.env(key, value);
    }

    let started = tokio::time::Instant::now();
    let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: program.to_string_lossy().into_owned(),
        source,
    })?;
    let mut guard = ChildDropGuard::new(child);

    if let StdinSource::Bytes(bytes) = stdin
        && let Some(mut handle) = guard.child_mut()?.stdin.take()
    {
        tokio::spawn(async move {
            if !bytes.is_empty() {
                let _ = handle.write_all(&bytes).await;
            }
            let _ = handle.shutdown().await;
        });
    }

    let stdout = guard
        .child_mut()?
        .stdout
        .take()
        .context("missing stdout pipe")?;
    let stderr = guard
        .child_mut()?
        .stderr
        .take()
        .context("missing stderr pipe")?;

    let out_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .context("failed to read stdout")?;
        Ok::<Vec<u8>, anyhow::Error>(buf)
    });

    let err_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .context("failed to read stderr")?;
        Ok::<Vec<u8>, anyhow::Error>(buf)
    });

    let wait_future = async move {
        let mut guard = guard;
        let status = guard
            .child_mut()?
            .wait()
            .await
            .context("failed to wait on process")?;
        let elapsed = started.elapsed();
        guard.kill_group();
        let stdout = drain(out_task, "stdout").await?;
        let stderr = drain(err_task, "stderr").await?;
        guard.disarm();
        Ok::<Collected, anyhow::Error>(Collected {
            status,
            stdout,
            stderr,
            elapsed,
        })
    };

    match deadline {
        Some(limit) => match timeout(limit, wait_future).await {
            Ok(collected) => Ok(collected?),
            Err(_) => Err(ProcessError::TimedOut(limit)),
        },
        None => Ok(wait_future.await?),
    }
}
