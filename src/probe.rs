//! GnuPG dialect detection.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::GpgPrograms;
use crate::dialect::Dialect;

/// Finds out which GnuPG dialect is usable right now.
///
/// Absence of both binaries is an ordinary answer (`Dialect::Undetermined`),
/// not an error.
#[async_trait]
pub trait VersionProbe: Send + Sync {
    async fn detect(&self) -> Dialect;
}

/// Probes the real executables with `--version`, preferring `gpg2`.
#[derive(Debug, Clone, Default)]
pub struct SystemProbe {
    programs: GpgPrograms,
}

impl SystemProbe {
    pub fn new(programs: GpgPrograms) -> Self {
        Self { programs }
    }
}

#[async_trait]
impl VersionProbe for SystemProbe {
    async fn detect(&self) -> Dialect {
        if answers_version(&self.programs.v2).await {
            return Dialect::V2;
        }
        if answers_version(&self.programs.v1).await {
            return Dialect::V1;
        }
        debug!(
            v1 = %self.programs.v1,
            v2 = %self.programs.v2,
            "No usable gpg found"
        );
        Dialect::Undetermined
    }
}

/// `--version` is read-only; it never touches a keyring.
async fn answers_version(program: &str) -> bool {
    let status = Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await;
    match status {
        Ok(status) => {
            debug!(program = %program, status = %status, "gpg version probe");
            status.success()
        }
        Err(e) => {
            debug!(program = %program, error = %e, "gpg version probe could not launch");
            false
        }
    }
}
