//! GnuPG 1.x client (`gpg`).
//!
//! gpg 1.x has no pinentry mode switch; in batch mode it reads the
//! passphrase straight from `--passphrase-fd`.

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
pub struct GpgV1Client {
    config: ClientConfig,
    runner: ProcessRunner,
}

impl GpgV1Client {
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
        &self.config.programs.v1
    }

    /// `[--homedir DIR] --batch --passphrase-fd FD --export-secret-key 0xKEYID`
    pub fn private_key_args(&self, key_id: KeyId, passphrase_fd: RawFd) -> Vec<String> {
        let mut args = self.config.base_args();
        args.extend([
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::GpgClient;
    use crate::config::GpgPrograms;
    use crate::dialect::Dialect;
    use crate::test_support::StubGpg;

    fn client_for(stub: &StubGpg) -> GpgClient {
        let programs = GpgPrograms {
            v1: stub.program().to_string(),
            v2: "gpg2".to_string(),
        };
        GpgClient::new(Dialect::V1, ClientConfig::new("").with_programs(programs)).unwrap()
    }

    #[test]
    fn test_private_key_args_have_no_pinentry_mode() {
        let client = GpgV1Client::new(ClientConfig::new(""));
        let args = client.private_key_args(KeyId(0xfeed), 5);
        assert_eq!(
            args,
            vec!["--batch", "--passphrase-fd", "5", "--export-secret-key", "0xfeed"]
        );
        assert!(!args.iter().any(|a| a == "--pinentry-mode"));
    }

    #[tokio::test]
    async fn test_read_public_keyring_uses_gpg_binary() {
        let stub = StubGpg::with_script(|dir| {
            format!(
                "printf '%s\\n' \"$@\" > '{}/args'\nprintf 'PUBRING'\n",
                dir.display()
            )
        });
        let client = client_for(&stub);
        assert_eq!(client.program(), stub.program());

        let bytes = client.read_public_keyring().await.unwrap();
        assert_eq!(bytes, b"PUBRING");
        let args = std::fs::read_to_string(stub.dir().join("args")).unwrap();
        assert_eq!(args, "--batch\n--export\n");
    }

    #[tokio::test]
    async fn test_get_private_key_reads_passphrase_from_fd() {
        let stub = StubGpg::new(
            "fd=''\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = '--passphrase-fd' ]; then fd=\"$2\"; fi\n  shift\ndone\n[ -n \"$fd\" ] || exit 3\nexec cat \"/dev/fd/$fd\"\n",
        );
        let client = client_for(&stub);

        let bytes = client
            .get_private_key(KeyId(0x42), Passphrase::from("v1 passphrase"))
            .await
            .unwrap();
        assert_eq!(bytes, b"v1 passphrase");
    }

    #[tokio::test]
    async fn test_get_secret_key_details_missing() {
        let stub = StubGpg::new("echo 'gpg: error reading key: No secret key' >&2\nexit 2\n");
        let client = client_for(&stub);

        let lookup = client.get_secret_key_details(KeyId(0x42)).await.unwrap();
        assert!(!lookup.found);
        assert!(lookup.output.is_empty());
    }
}
