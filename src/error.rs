//! Error types for the GPG process layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpgError {
    /// The dialect could not be determined, or the selector was unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The executable could not be started (missing, not executable, ...).
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The executable ran and exited with a failure status. `stderr` is kept as captured.
    #[error("error from {program}: {}", .stderr.trim_end())]
    Process { program: String, stderr: String },

    /// Capturing output or waiting on the child failed after it was started.
    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open passphrase channel: {0}")]
    SecretChannel(#[source] std::io::Error),
}

pub type GpgResult<T> = Result<T, GpgError>;

impl GpgError {
    pub(crate) fn process(program: &str, stderr: &[u8]) -> Self {
        Self::Process {
            program: program.to_string(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        }
    }

    /// Executable path the failing invocation attempted, if any.
    pub fn program(&self) -> Option<&str> {
        match self {
            Self::Launch { program, .. }
            | Self::Process { program, .. }
            | Self::Io { program, .. } => Some(program),
            Self::Configuration(_) | Self::SecretChannel(_) => None,
        }
    }

    /// Captured stderr for failed invocations.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Process { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}
