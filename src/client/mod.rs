//! Dialect-specific GnuPG clients.
//!
//! ## Architecture
//!
//! ```text
//!   GpgClient ──┬── V1(GpgV1Client)  gpg,  --passphrase-fd only
//!               └── V2(GpgV2Client)  gpg2, --pinentry-mode loopback
//!        │
//!        ▼
//!   argv ──► ProcessRunner ◄── SecretChannel (get_private_key only)
//! ```
//!
//! Each call builds its own argv, spawns one `gpg` process, and tears
//! everything down before returning. Nothing is kept between calls.

mod recipients;
pub mod v1;
pub mod v2;

use std::fmt;
use std::os::fd::RawFd;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClientConfig;
use crate::dialect::Dialect;
use crate::error::{GpgError, GpgResult};
use crate::runner::ProcessRunner;
use crate::secret_channel::{self, Passphrase};

pub use recipients::extract_email;
pub use v1::GpgV1Client;
pub use v2::GpgV2Client;

/// 64-bit OpenPGP key ID, rendered as `0x` + lowercase hex for gpg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyId(pub u64);

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<u64> for KeyId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for KeyId {
    type Err = std::num::ParseIntError;

    /// Hex digits with an optional `0x`/`0X` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        u64::from_str_radix(digits, 16).map(Self)
    }
}

/// Result of a key metadata query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLookup {
    /// gpg's listing output; empty when the key was not found.
    pub output: Vec<u8>,
    pub found: bool,
}

impl KeyLookup {
    pub fn found(output: Vec<u8>) -> Self {
        Self {
            output,
            found: true,
        }
    }

    pub fn missing() -> Self {
        Self {
            output: Vec::new(),
            found: false,
        }
    }
}

/// Which keyring a metadata query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyListing {
    /// `-k`
    Public,
    /// `-K`
    Secret,
}

impl KeyListing {
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Public => "-k",
            Self::Secret => "-K",
        }
    }
}

/// A GnuPG client bound to one dialect for its whole lifetime.
#[derive(Debug, Clone)]
pub enum GpgClient {
    V1(GpgV1Client),
    V2(GpgV2Client),
}

impl GpgClient {
    /// Build a client for a resolved dialect.
    pub fn new(dialect: Dialect, config: ClientConfig) -> GpgResult<Self> {
        match dialect {
            Dialect::V1 => Ok(Self::V1(GpgV1Client::new(config))),
            Dialect::V2 => Ok(Self::V2(GpgV2Client::new(config))),
            Dialect::Undetermined => Err(GpgError::Configuration(
                "unable to determine GPG version".to_string(),
            )),
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            Self::V1(_) => Dialect::V1,
            Self::V2(_) => Dialect::V2,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        match self {
            Self::V1(c) => c.config(),
            Self::V2(c) => c.config(),
        }
    }

    /// Executable this client invokes.
    pub fn program(&self) -> &str {
        match self {
            Self::V1(c) => c.program(),
            Self::V2(c) => c.program(),
        }
    }

    /// Export the whole public keyring (`--batch --export`).
    pub async fn read_public_keyring(&self) -> GpgResult<Vec<u8>> {
        match self {
            Self::V1(c) => c.read_public_keyring().await,
            Self::V2(c) => c.read_public_keyring().await,
        }
    }

    /// Export one secret key, unlocking it with `passphrase`.
    pub async fn get_private_key(&self, key_id: KeyId, passphrase: Passphrase) -> GpgResult<Vec<u8>> {
        match self {
            Self::V1(c) => c.get_private_key(key_id, passphrase).await,
            Self::V2(c) => c.get_private_key(key_id, passphrase).await,
        }
    }

    pub async fn get_secret_key_details(&self, key_id: KeyId) -> GpgResult<KeyLookup> {
        self.key_details(KeyListing::Secret, key_id).await
    }

    pub async fn get_key_details(&self, key_id: KeyId) -> GpgResult<KeyLookup> {
        self.key_details(KeyListing::Public, key_id).await
    }

    async fn key_details(&self, listing: KeyListing, key_id: KeyId) -> GpgResult<KeyLookup> {
        match self {
            Self::V1(c) => c.key_details(listing, key_id).await,
            Self::V2(c) => c.key_details(listing, key_id).await,
        }
    }

    /// Map recipient identifiers to email addresses where gpg knows them.
    ///
    /// Never fails: identifiers that cannot be resolved are passed through
    /// unchanged, in order.
    pub async fn resolve_recipients(&self, identifiers: &[String]) -> Vec<String> {
        recipients::resolve(self, identifiers).await
    }
}

/// `[--homedir DIR] --batch -k|-K 0xKEYID`
pub(crate) fn key_details_args(config: &ClientConfig, listing: KeyListing, key_id: KeyId) -> Vec<String> {
    let mut args = config.base_args();
    args.push("--batch".to_string());
    args.push(listing.flag().to_string());
    args.push(key_id.to_string());
    args
}

/// `[--homedir DIR] --batch --export`
pub(crate) fn public_keyring_args(config: &ClientConfig) -> Vec<String> {
    let mut args = config.base_args();
    args.push("--batch".to_string());
    args.push("--export".to_string());
    args
}

/// Run a key listing and separate "no such key" from real failures.
pub(crate) async fn run_key_details(
    runner: &ProcessRunner,
    program: &str,
    args: &[String],
) -> GpgResult<KeyLookup> {
    let result = runner.execute(program, args, Vec::new()).await?;
    if result.success() {
        return Ok(KeyLookup::found(result.stdout));
    }
    if reports_missing_key(&result.stderr_text()) {
        debug!(program = %program, "Key not present in keyring");
        return Ok(KeyLookup::missing());
    }
    result.into_stdout().map(KeyLookup::found)
}

/// Export a secret key, feeding the passphrase through a private pipe.
///
/// `build_args` receives the descriptor number the child will read from.
pub(crate) async fn run_with_passphrase<F>(
    runner: &ProcessRunner,
    program: &str,
    passphrase: Passphrase,
    build_args: F,
) -> GpgResult<Vec<u8>>
where
    F: FnOnce(RawFd) -> Vec<String>,
{
    let (writer, reader) = secret_channel::open().map_err(GpgError::SecretChannel)?;
    let args = build_args(reader.raw());
    let write_task = writer.spawn_write(passphrase);

    let result = runner.run(program, &args, vec![reader.into_owned()]).await;

    // The child may exit without reading, which breaks the pipe under the writer.
    match write_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(program = %program, error = %e, "Passphrase write did not complete"),
        Err(e) => debug!(program = %program, error = %e, "Passphrase writer task failed"),
    }

    result
}

/// Matches gpg's untranslated messages; the runner pins the child to the C locale.
fn reports_missing_key(stderr: &str) -> bool {
    let text = stderr.to_lowercase();
    ["no public key", "no secret key", "not found"]
        .iter()
        .any(|needle| text.contains(needle))
}
