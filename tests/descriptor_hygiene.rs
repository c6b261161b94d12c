//! Descriptor accounting across repeated secret key exports.
//!
//! Counts this process's open descriptors, so it lives in its own test binary
//! with a single test: nothing else may open or close files concurrently.

#![cfg(target_os = "linux")]

use std::os::unix::fs::PermissionsExt;

use gpgbridge::{ClientConfig, Dialect, GpgClient, GpgError, GpgPrograms, KeyId, Passphrase};
use tempfile::TempDir;

const ROUNDS: usize = 50;

fn open_descriptors() -> usize {
    std::fs::read_dir("/proc/self/fd")
        .expect("list /proc/self/fd")
        .count()
}

fn v2_client(program: &str) -> GpgClient {
    let programs = GpgPrograms {
        v1: "gpg".to_string(),
        v2: program.to_string(),
    };
    GpgClient::new(Dialect::V2, ClientConfig::new("").with_programs(programs)).unwrap()
}

/// A gpg2 stand-in that exits without touching the passphrase descriptor.
fn non_reading_stub(dir: &TempDir) -> String {
    let path = dir.path().join("gpg2");
    std::fs::write(&path, "#!/bin/sh\necho 'gpg: no secret key' >&2\nexit 2\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().to_string()
}

#[tokio::test]
async fn test_secret_key_export_releases_descriptors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = v2_client("/nonexistent/gpgbridge-test/gpg2");
    let silent = v2_client(&non_reading_stub(&dir));

    // Child reaping sets up its own descriptors on first use.
    let _ = missing.get_private_key(KeyId(0x42), Passphrase::from("x")).await;
    let _ = silent.get_private_key(KeyId(0x42), Passphrase::from("x")).await;
    let baseline = open_descriptors();

    for _ in 0..ROUNDS {
        let err = missing
            .get_private_key(KeyId(0x42), Passphrase::from("secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, GpgError::Launch { .. }));
    }
    assert_eq!(open_descriptors(), baseline, "launch failures leaked descriptors");

    for _ in 0..ROUNDS {
        let err = silent
            .get_private_key(KeyId(0x42), Passphrase::from("secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, GpgError::Process { .. }));
    }
    assert_eq!(open_descriptors(), baseline, "unread passphrase pipes leaked descriptors");
}
