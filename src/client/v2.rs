//! GnuPG 2.x client (`gpg2`).
//!
//! gpg2 routes passphrases through its agent and pinentry; `--pinentry-mode
//! loopback` makes it accept the passphrase from `--passphrase-fd` instead.

use std::os::fd::RawFd;

use tracing::info;

use super::{
    key_details_args, public_keyring_args, run_key_details, run_with_passphrase, KeyId,
    KeyListing, KeyLookup,
};
use crate::config::ClientConfig;
use crate::error::GpgResult;
use crate::runner::ProcessRunner;
use crate::secret_channel::Passphrase;

#[derive(Debug, Clone)]
pub struct GpgV2Client {
    config: ClientConfig,
    runner: ProcessRunner,
}

impl GpgV2Client {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            runner: ProcessRunner::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn program(&self) -> &str {
        &self.config.programs.v2
    }

    /// `[--homedir DIR] --pinentry-mode loopback --batch --passphrase-fd FD --export-secret-key 0xKEYID`
    pub fn private_key_args(&self, key_id: KeyId, passphrase_fd: RawFd) -> Vec<String> {
        let mut args = self.config.base_args();
        args.extend([
            "--pinentry-mode".to_string(),
            "loopback".to_string(),
            "--batch".to_string(),
            "--passphrase-fd".to_string(),
            passphrase_fd.to_string(),
            "--export-secret-key".to_string(),
            key_id.to_string(),
        ]);
        args
    }

    pub async fn read_public_keyring(&self) -> GpgResult<Vec<u8>> {
        let args = public_keyring_args(&self.config);
        self.runner.run(self.program(), &args, Vec::new()).await
    }

    pub async fn get_private_key(&self, key_id: KeyId, passphrase: Passphrase) -> GpgResult<Vec<u8>> {
        info!(program = %self.program(), key_id = %key_id, "Exporting secret key");
        run_with_passphrase(&self.runner, self.program(), passphrase, |fd| {
            self.private_key_args(key_id, fd)
        })
        .await
    }

    pub(crate) async fn key_details(&self, listing: KeyListing, key_id: KeyId) -> GpgResult<KeyLookup> {
        let args = key_details_args(&self.config, listing, key_id);
        run_key_details(&self.runner, self.program(), &args).await
    }
}
