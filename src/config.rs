//! Configuration for the GPG bridge.
//!
//! Configuration can be set via environment variables:
//! - `GPGBRIDGE_GPG_VERSION` - Optional. `v1` or `v2`. Unset or unrecognized means auto-detect.
//! - `GPGBRIDGE_HOMEDIR` - Optional. GnuPG home directory passed as `--homedir`.
//! - `GPGBRIDGE_GPG_PATH` - Optional. GnuPG 1.x executable. Defaults to `gpg`.
//! - `GPGBRIDGE_GPG2_PATH` - Optional. GnuPG 2.x executable. Defaults to `gpg2`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::dialect::Dialect;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

pub const DEFAULT_GPG_PROGRAM: &str = "gpg";
pub const DEFAULT_GPG2_PROGRAM: &str = "gpg2";

/// Executables used for each dialect, resolved through `PATH` unless absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpgPrograms {
    pub v1: String,
    pub v2: String,
}

impl Default for GpgPrograms {
    fn default() -> Self {
        Self {
            v1: DEFAULT_GPG_PROGRAM.to_string(),
            v2: DEFAULT_GPG2_PROGRAM.to_string(),
        }
    }
}

impl GpgPrograms {
    /// Executable for a resolved dialect.
    pub fn for_dialect(&self, dialect: Dialect) -> Option<&str> {
        match dialect {
            Dialect::V1 => Some(&self.v1),
            Dialect::V2 => Some(&self.v2),
            Dialect::Undetermined => None,
        }
    }
}

/// Per-client settings. Read-only once a client is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// GnuPG home directory; `None` uses the tool's default.
    #[serde(default)]
    pub home_dir: Option<PathBuf>,

    #[serde(default)]
    pub programs: GpgPrograms,
}

impl ClientConfig {
    /// Build from a home directory string. An empty string means the system default.
    pub fn new(home_dir: &str) -> Self {
        Self {
            home_dir: non_empty(home_dir).map(PathBuf::from),
            programs: GpgPrograms::default(),
        }
    }

    pub fn with_programs(mut self, programs: GpgPrograms) -> Self {
        self.programs = programs;
        self
    }

    pub fn home_dir(&self) -> Option<&Path> {
        self.home_dir.as_deref()
    }

    /// Arguments prepended to every invocation.
    pub fn base_args(&self) -> Vec<String> {
        match &self.home_dir {
            Some(dir) => vec!["--homedir".to_string(), dir.to_string_lossy().to_string()],
            None => Vec::new(),
        }
    }
}

/// Process-level configuration, typically loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Dialect selector as given; `None` triggers detection.
    pub gpg_version: Option<String>,

    /// Home directory string; empty means the system default.
    pub home_dir: String,

    pub programs: GpgPrograms,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if an executable override is set but blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        let gpg_version = std::env::var("GPGBRIDGE_GPG_VERSION")
            .ok()
            .and_then(|v| non_empty(&v).map(str::to_string));
        if let Some(ref selector) = gpg_version {
            if Dialect::parse(selector).is_none() {
                tracing::warn!(
                    selector = %selector,
                    supported = ?Dialect::supported_values(),
                    "Unrecognized GPGBRIDGE_GPG_VERSION, falling back to detection"
                );
            }
        }

        let home_dir = std::env::var("GPGBRIDGE_HOMEDIR").unwrap_or_default();

        let mut programs = GpgPrograms::default();
        if let Some(v1) = program_override("GPGBRIDGE_GPG_PATH")? {
            programs.v1 = v1;
        }
        if let Some(v2) = program_override("GPGBRIDGE_GPG2_PATH")? {
            programs.v2 = v2;
        }

        Ok(Self {
            gpg_version,
            home_dir,
            programs,
        })
    }

    /// Apply command line values on top of the environment.
    pub fn with_overrides(mut self, gpg_version: Option<String>, home_dir: Option<String>) -> Self {
        if gpg_version.is_some() {
            self.gpg_version = gpg_version;
        }
        if let Some(home_dir) = home_dir {
            self.home_dir = home_dir;
        }
        self
    }
}

fn program_override(name: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(name) {
        Ok(value) if value.trim().is_empty() => Err(ConfigError::InvalidValue(
            name.to_string(),
            "executable path must not be empty".to_string(),
        )),
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(_) => Ok(None),
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
