//! # gpgbridge
//!
//! Process bridge to the GnuPG command line.
//!
//! This library provides:
//! - Detection of the installed GnuPG dialect (`gpg2` vs. `gpg`)
//! - One client interface over both argument conventions
//! - Passphrase hand-off through a private inherited pipe, never argv
//! - Concurrent stdout/stderr capture with stderr-bearing errors
//!
//! ## Architecture
//!
//! ```text
//!   ClientFactory ──► VersionProbe (only when no dialect is requested)
//!        │
//!        ▼
//!   GpgClient::{V1, V2} ──► ProcessRunner ──► gpg / gpg2
//!                               ▲
//!                         SecretChannel (--passphrase-fd)
//! ```
//!
//! No cryptography happens here; exported key material is passed through as
//! opaque bytes.
//!
//! ## Modules
//! - `client`: dialect clients and key lookups
//! - `factory`: client construction
//! - `probe`: dialect detection
//! - `runner`: child process execution
//! - `secret_channel`: passphrase pipe

pub mod client;
pub mod config;
pub mod dialect;
pub mod error;
pub mod factory;
pub mod probe;
pub mod runner;
pub mod secret_channel;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{GpgClient, KeyId, KeyLookup};
pub use config::{ClientConfig, Config, GpgPrograms};
pub use dialect::Dialect;
pub use error::{GpgError, GpgResult};
pub use factory::ClientFactory;
pub use probe::{SystemProbe, VersionProbe};
pub use secret_channel::Passphrase;
