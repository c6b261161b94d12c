//! Process execution for GnuPG invocations.
//!
//! Every call spawns a fresh child with stdin closed, stdout and stderr piped,
//! and both streams drained on their own tasks while the child runs. A chatty
//! child can therefore never fill one pipe while we block on the other.
//!
//! Children run with `LC_ALL=C` and `LANGUAGE=C` so gpg's diagnostics stay
//! untranslated; callers match on them.

use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{GpgError, GpgResult};
use crate::secret_channel::set_cloexec;

/// Captured outcome of one finished invocation.
#[derive(Debug)]
pub struct InvocationResult {
    pub program: String,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: ExitStatus,
}

impl InvocationResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Stdout on success; a `Process` error carrying stderr otherwise.
    ///
    /// Stdout is dropped on failure, even if the child printed something.
    pub fn into_stdout(self) -> GpgResult<Vec<u8>> {
        if self.status.success() {
            if !self.stderr.is_empty() {
                debug!(
                    program = %self.program,
                    stderr = %String::from_utf8_lossy(&self.stderr).trim_end(),
                    "gpg wrote diagnostics on success"
                );
            }
            Ok(self.stdout)
        } else {
            Err(GpgError::process(&self.program, &self.stderr))
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run `program` and return its stdout, or an error carrying its stderr.
    pub async fn run(
        &self,
        program: &str,
        args: &[String],
        inherited: Vec<OwnedFd>,
    ) -> GpgResult<Vec<u8>> {
        self.execute(program, args, inherited).await?.into_stdout()
    }

    /// Run `program` to completion and return everything it produced.
    ///
    /// Only launch and capture failures are errors here; a non-zero exit is
    /// reported through [`InvocationResult::status`]. Descriptors in
    /// `inherited` stay open across exec in the child and are closed in this
    /// process as soon as the child has been spawned.
    pub async fn execute(
        &self,
        program: &str,
        args: &[String],
        inherited: Vec<OwnedFd>,
    ) -> GpgResult<InvocationResult> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("LC_ALL", "C")
            .env("LANGUAGE", "C")
            .kill_on_drop(true);

        if !inherited.is_empty() {
            let fds: Vec<RawFd> = inherited.iter().map(|fd| fd.as_raw_fd()).collect();
            // SAFETY: the hook runs between fork and exec and only calls fcntl,
            // which is async-signal-safe, on descriptors this process owns.
            unsafe {
                cmd.pre_exec(move || {
                    for fd in &fds {
                        set_cloexec(*fd, false)?;
                    }
                    Ok(())
                });
            }
        }

        debug!(program = %program, args = ?args, "Spawning gpg");

        let mut child = cmd.spawn().map_err(|source| {
            warn!(program = %program, error = %source, "Failed to launch gpg");
            GpgError::Launch {
                program: program.to_string(),
                source,
            }
        })?;

        // The child holds its own copies now.
        drop(inherited);

        let stdout = child.stdout.take().ok_or_else(|| GpgError::Io {
            program: program.to_string(),
            source: std::io::Error::other("stdout was not captured"),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| GpgError::Io {
            program: program.to_string(),
            source: std::io::Error::other("stderr was not captured"),
        })?;

        let stdout_task = drain(stdout);
        let stderr_task = drain(stderr);

        let status = child.wait().await.map_err(|source| GpgError::Io {
            program: program.to_string(),
            source,
        })?;

        let stdout = join_drain(program, stdout_task).await?;
        let stderr = join_drain(program, stderr_task).await?;

        debug!(
            program = %program,
            status = %status,
            stdout_len = stdout.len(),
            stderr_len = stderr.len(),
            "gpg finished"
        );

        Ok(InvocationResult {
            program: program.to_string(),
            stdout,
            stderr,
            status,
        })
    }
}

fn drain<R>(mut stream: R) -> JoinHandle<std::io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await?;
        Ok(buf)
    })
}

async fn join_drain(
    program: &str,
    task: JoinHandle<std::io::Result<Vec<u8>>>,
) -> GpgResult<Vec<u8>> {
    let io_err = |source| GpgError::Io {
        program: program.to_string(),
        source,
    };
    match task.await {
        Ok(result) => result.map_err(io_err),
        Err(join_err) => Err(io_err(std::io::Error::other(join_err))),
    }
}
