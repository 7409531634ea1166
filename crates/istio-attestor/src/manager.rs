//! Ownership of the shared Kubernetes client.
//!
//! The manager holds at most one client. [`ClientManager::configure`] builds
//! the replacement before taking the lock, so a failed reconfiguration leaves
//! the previous client in place and readers never wait on I/O.

use istio_attestor_core::{AttestorError, Result};
use istio_attestor_kube::{KubeClient, TokenReviewer};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

/// Builds a token reviewer from a kubeconfig path (empty for in-cluster)
pub trait ClientFactory: Send + Sync {
    fn build(&self, config_path: &str) -> Result<Arc<dyn TokenReviewer>>;
}

/// Builds [`KubeClient`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct KubeClientFactory;

impl ClientFactory for KubeClientFactory {
    fn build(&self, config_path: &str) -> Result<Arc<dyn TokenReviewer>> {
        let client = KubeClient::from_config_path(config_path)?;
        info!(server = %client.server(), "created Kubernetes client");
        Ok(Arc::new(client))
    }
}

/// Lazily configured, replaceable handle to the token review backend
pub struct ClientManager {
    factory: Box<dyn ClientFactory>,
    current: Mutex<Option<Arc<dyn TokenReviewer>>>,
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClientManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientManager")
            .field("configured", &self.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl ClientManager {
    /// Create an unconfigured manager that builds [`KubeClient`]s
    #[must_use]
    pub fn new() -> Self {
        Self::with_factory(KubeClientFactory)
    }

    /// Create an unconfigured manager with a custom client factory
    #[must_use]
    pub fn with_factory(factory: impl ClientFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            current: Mutex::new(None),
        }
    }

    /// Build a client for `config_path` and install it, replacing any
    /// previous client. On error the previous client is kept.
    pub fn configure(&self, config_path: &str) -> Result<()> {
        let client = self.factory.build(config_path).map_err(|e| match e {
            AttestorError::Config(_) => e,
            other => AttestorError::Config(format!("error creating kubeClient: {other}")),
        })?;

        *self.lock() = Some(client);
        Ok(())
    }

    /// Current client, or [`AttestorError::NotConfigured`]
    pub fn client(&self) -> Result<Arc<dyn TokenReviewer>> {
        self.lock().clone().ok_or(AttestorError::NotConfigured)
    }

    // Critical sections never panic, so a poisoned lock still holds a whole value.
    fn lock(&self) -> MutexGuard<'_, Option<Arc<dyn TokenReviewer>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{PathFactory, StaticReviewer};
    use istio_attestor_core::ErrorKind;

    #[test]
    fn client_before_configure_is_not_configured() {
        let manager = ClientManager::with_factory(PathFactory::default());
        let err = manager.client().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotConfigured);
    }

    #[test]
    fn last_configure_wins() {
        let ambient = StaticReviewer::authenticated("system:serviceaccount:a:b");
        let explicit = StaticReviewer::authenticated("system:serviceaccount:c:d");
        let factory = PathFactory::default()
            .with("", ambient.clone())
            .with("/etc/spire/kubeconfig", explicit.clone());
        let manager = ClientManager::with_factory(factory);

        manager.configure("").unwrap();
        let ambient_dyn: Arc<dyn TokenReviewer> = ambient;
        assert!(Arc::ptr_eq(&manager.client().unwrap(), &ambient_dyn));

        manager.configure("/etc/spire/kubeconfig").unwrap();
        let explicit_dyn: Arc<dyn TokenReviewer> = explicit;
        assert!(Arc::ptr_eq(&manager.client().unwrap(), &explicit_dyn));
    }

    #[test]
    fn failed_reconfigure_keeps_previous_client() {
        let working = StaticReviewer::authenticated("system:serviceaccount:a:b");
        let manager =
            ClientManager::with_factory(PathFactory::default().with("/good", working.clone()));

        manager.configure("/good").unwrap();
        let err = manager.configure("/broken").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let working_dyn: Arc<dyn TokenReviewer> = working;
        assert!(Arc::ptr_eq(&manager.client().unwrap(), &working_dyn));
    }

    #[test]
    fn factory_errors_become_config_errors() {
        struct Failing;
        impl ClientFactory for Failing {
            fn build(&self, _: &str) -> Result<Arc<dyn TokenReviewer>> {
                Err(AttestorError::Http("dial tcp: connection refused".into()))
            }
        }

        let manager = ClientManager::with_factory(Failing);
        let err = manager.configure("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("error creating kubeClient"));
    }

    #[test]
    fn kube_factory_rejects_missing_kubeconfig() {
        let manager = ClientManager::new();
        let err = manager.configure("/nonexistent/kubeconfig").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(manager.client().err().unwrap().kind(), ErrorKind::NotConfigured);
    }

    #[test]
    fn concurrent_readers_see_whole_clients() {
        let first = StaticReviewer::authenticated("system:serviceaccount:a:b");
        let second = StaticReviewer::authenticated("system:serviceaccount:c:d");
        let first_dyn: Arc<dyn TokenReviewer> = first.clone();
        let second_dyn: Arc<dyn TokenReviewer> = second.clone();
        let manager = Arc::new(ClientManager::with_factory(
            PathFactory::default()
                .with("/first", first)
                .with("/second", second),
        ));
        manager.configure("/first").unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let (first, second) = (Arc::clone(&first_dyn), Arc::clone(&second_dyn));
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        let client = manager.client().unwrap();
                        assert!(Arc::ptr_eq(&client, &first) || Arc::ptr_eq(&client, &second));
                    }
                })
            })
            .collect();

        for i in 0..1_000 {
            let path = if i % 2 == 0 { "/second" } else { "/first" };
            manager.configure(path).unwrap();
        }
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
