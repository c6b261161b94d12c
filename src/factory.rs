//! Client construction from a requested or detected dialect.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::client::GpgClient;
use crate::config::{ClientConfig, GpgPrograms};
use crate::dialect::Dialect;
use crate::error::{GpgError, GpgResult};
use crate::probe::{SystemProbe, VersionProbe};

/// Resolves a dialect selector into a [`GpgClient`].
///
/// Detection runs on every call by default, since the installed tools can
/// change under a long-lived process. [`ClientFactory::with_detection_cache`]
/// remembers the first determined answer until
/// [`ClientFactory::invalidate_detection`] is called.
pub struct ClientFactory {
    probe: Arc<dyn VersionProbe>,
    programs: GpgPrograms,
    cache: Option<Mutex<Option<Dialect>>>,
}

impl ClientFactory {
    /// Factory probing the given executables.
    pub fn new(programs: GpgPrograms) -> Self {
        Self {
            probe: Arc::new(SystemProbe::new(programs.clone())),
            programs,
            cache: None,
        }
    }

    pub fn with_probe(programs: GpgPrograms, probe: Arc<dyn VersionProbe>) -> Self {
        Self {
            probe,
            programs,
            cache: None,
        }
    }

    pub fn with_detection_cache(mut self) -> Self {
        self.cache = Some(Mutex::new(None));
        self
    }

    /// Forget a cached detection result; the next `create` probes again.
    pub async fn invalidate_detection(&self) {
        if let Some(cache) = &self.cache {
            *cache.lock().await = None;
        }
    }

    /// Build a client.
    ///
    /// `requested` of `"v1"` or `"v2"` is used as-is; `None` or anything else
    /// triggers detection. An empty `home_dir` means gpg's default.
    pub async fn create(&self, requested: Option<&str>, home_dir: &str) -> GpgResult<GpgClient> {
        let dialect = match requested.and_then(Dialect::parse) {
            Some(dialect) => dialect,
            None => {
                if let Some(selector) = requested {
                    debug!(selector = %selector, "Unrecognized GPG version selector, detecting");
                }
                self.detect().await
            }
        };

        if !dialect.is_determined() {
            return Err(GpgError::Configuration(
                "unable to determine GPG version".to_string(),
            ));
        }

        let config = ClientConfig::new(home_dir).with_programs(self.programs.clone());
        info!(dialect = %dialect, home_dir = ?config.home_dir(), "Created GPG client");
        GpgClient::new(dialect, config)
    }

    async fn detect(&self) -> Dialect {
        let Some(cache) = &self.cache else {
            return self.probe.detect().await;
        };

        let mut cached = cache.lock().await;
        if let Some(dialect) = *cached {
            return dialect;
        }
        let dialect = self.probe.detect().await;
        if dialect.is_determined() {
            *cached = Some(dialect);
        }
        dialect
    }
}

impl Default for ClientFactory {
    fn default() -> Self {
        Self::new(GpgPrograms::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::missing_program;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    struct CountingProbe {
        answer: Dialect,
        calls: AtomicUsize,
    }

    impl CountingProbe {
        fn new(answer: Dialect) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VersionProbe for CountingProbe {
        async fn detect(&self) -> Dialect {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }

    #[tokio::test]
    async fn test_explicit_dialect_skips_probe() {
        for (selector, expected) in [("v1", Dialect::V1), ("v2", Dialect::V2)] {
            let probe = CountingProbe::new(Dialect::Undetermined);
            let factory = ClientFactory::with_probe(GpgPrograms::default(), probe.clone());

            let client = assert_ok!(factory.create(Some(selector), "/tmp/testring").await);
            assert_eq!(client.dialect(), expected);
            assert_eq!(probe.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_missing_or_unknown_selector_probes() {
        let probe = CountingProbe::new(Dialect::V1);
        let factory = ClientFactory::with_probe(GpgPrograms::default(), probe.clone());

        let client = assert_ok!(factory.create(None, "").await);
        assert_eq!(client.dialect(), Dialect::V1);
        assert!(client.config().home_dir().is_none());

        let client = assert_ok!(factory.create(Some("v3"), "").await);
        assert_eq!(client.dialect(), Dialect::V1);
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test]
    async fn test_undetermined_is_configuration_error() {
        let probe = CountingProbe::new(Dialect::Undetermined);
        let factory = ClientFactory::with_probe(GpgPrograms::default(), probe);

        let err = assert_err!(factory.create(None, "").await);
        match err {
            GpgError::Configuration(msg) => assert_eq!(msg, "unable to determine GPG version"),
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_absent_binaries_fail_without_hanging() {
        let factory = ClientFactory::new(GpgPrograms {
            v1: missing_program("gpg"),
            v2: missing_program("gpg2"),
        });
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            factory.create(None, "/tmp/testring"),
        )
        .await
        .expect("factory hung");
        assert!(matches!(result, Err(GpgError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_detection_cache_and_invalidation() {
        let probe = CountingProbe::new(Dialect::V2);
        let factory =
            ClientFactory::with_probe(GpgPrograms::default(), probe.clone()).with_detection_cache();

        assert_ok!(factory.create(None, "").await);
        assert_ok!(factory.create(None, "").await);
        assert_eq!(probe.calls(), 1);

        factory.invalidate_detection().await;
        assert_ok!(factory.create(None, "").await);
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test]
    async fn test_undetermined_is_not_cached() {
        let probe = CountingProbe::new(Dialect::Undetermined);
        let factory =
            ClientFactory::with_probe(GpgPrograms::default(), probe.clone()).with_detection_cache();

        assert_err!(factory.create(None, "").await);
        assert_err!(factory.create(None, "").await);
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test]
    async fn test_programs_flow_into_client() {
        let programs = GpgPrograms {
            v1: "/opt/gnupg1/bin/gpg".to_string(),
            v2: "/opt/gnupg2/bin/gpg2".to_string(),
        };
        let factory = ClientFactory::with_probe(programs, CountingProbe::new(Dialect::V2));
        let client = assert_ok!(factory.create(Some("v1"), "").await);
        assert_eq!(client.program(), "/opt/gnupg1/bin/gpg");
    }
}
