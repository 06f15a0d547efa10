//! Compiler invocation
//!
//! Runs `go build` with diagnostic flags and streams its output. Stdout and
//! stderr are drained by separate tasks into one bounded channel so neither
//! pipe can fill up and stall the compiler while the other is being read.

use crate::config::Config;
use crate::error::{GcAssertError, Result};
use crate::loader::build_target;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// A `go build` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: String,
    pub args: Vec<String>,
    pub work_dir: PathBuf,
}

impl BuildCommand {
    /// The build of `package` described by `config`, run in `work_dir`.
    pub fn new(config: &Config, work_dir: &Path, package: &str) -> Self {
        let mut args = vec!["build".to_string(), format!("-gcflags={}", config.gcflags)];
        args.extend(config.build_args.iter().cloned());
        args.push(build_target(package));
        BuildCommand {
            program: config.go.clone(),
            args,
            work_dir: work_dir.to_path_buf(),
        }
    }

    /// Start the build; output lines arrive through the returned handle.
    pub fn spawn(&self, capacity: usize) -> Result<BuildOutput> {
        info!(program = %self.program, args = ?self.args, dir = %self.work_dir.display(), "running compiler");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| GcAssertError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let (tx, rx) = mpsc::channel(capacity.max(1));
        let mut drains = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            drains.push(tokio::spawn(drain(stdout, tx.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            drains.push(tokio::spawn(drain(stderr, tx)));
        }

        Ok(BuildOutput {
            program: self.program.clone(),
            child,
            lines: rx,
            drains,
        })
    }
}

/// Forward every line of `pipe` to `tx` until EOF or until the receiver is
/// gone. Invalid UTF-8 is replaced rather than ending the stream.
async fn drain<R>(pipe: R, tx: mpsc::Sender<String>) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&buf);
        let line = text.strip_suffix('\n').unwrap_or(&text).to_string();
        if tx.send(line).await.is_err() {
            return Ok(());
        }
    }
}

/// A running build.
pub struct BuildOutput {
    program: String,
    child: Child,
    lines: mpsc::Receiver<String>,
    drains: Vec<JoinHandle<io::Result<()>>>,
}

impl BuildOutput {
    /// Next output line from either pipe; `None` once both have closed.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Wait for the drainers and the process.
    ///
    /// A non-zero exit is an error: the diagnostics of a failed build are
    /// incomplete and cannot vouch for any directive.
    pub async fn finish(mut self) -> Result<ExitStatus> {
        self.lines.close();
        for handle in self.drains.drain(..) {
            match handle.await {
                Ok(result) => result?,
                Err(e) => return Err(io::Error::other(e).into()),
            }
        }
        let status = self.child.wait().await?;
        debug!(%status, "compiler exited");
        if !status.success() {
            return Err(GcAssertError::BuildFailed {
                program: self.program,
                status,
            });
        }
        Ok(status)
    }
}
