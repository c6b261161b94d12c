//! Stub GnuPG executables for tests.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A `/bin/sh` script standing in for `gpg`/`gpg2`, removed on drop.
pub(crate) struct StubGpg {
    dir: TempDir,
    program: String,
}

impl StubGpg {
    pub(crate) fn new(body: &str) -> Self {
        Self::with_script(|_| body.to_string())
    }

    /// Build the script body with access to the stub's scratch directory.
    pub(crate) fn with_script(body: impl FnOnce(&Path) -> String) -> Self {
        let dir = tempfile::tempdir().expect("create stub dir");
        let path = dir.path().join("gpg-stub");
        let script = format!("#!/bin/sh\n{}", body(dir.path()));
        std::fs::write(&path, script).expect("write stub script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod stub script");
        Self {
            program: path.to_string_lossy().to_string(),
            dir,
        }
    }

    pub(crate) fn program(&self) -> &str {
        &self.program
    }

    pub(crate) fn dir(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }
}

/// A path that is guaranteed not to exist.
pub(crate) fn missing_program(name: &str) -> String {
    format!("/nonexistent/gpgbridge-test/{}", name)
}
