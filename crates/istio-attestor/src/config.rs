//! Plugin configuration.

use istio_attestor_core::{AttestorError, Result};
use serde::{Deserialize, Serialize};

/// Configuration accepted by [`crate::IstioAttestor::configure`].
///
/// ```toml
/// k8s_config_path = "/etc/spire/kubeconfig"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestorConfig {
    /// Kubeconfig used to reach the API server. Unset or empty selects
    /// in-cluster credentials.
    #[serde(default)]
    pub k8s_config_path: Option<String>,
}

impl AttestorConfig {
    /// Parse a configuration document. Unknown keys are ignored.
    pub fn parse(configuration: &str) -> Result<Self> {
        toml::from_str(configuration).map_err(|e| {
            AttestorError::Config(format!("error parsing Istio Attestor configuration: {e}"))
        })
    }

    /// Kubeconfig path, empty for in-cluster credentials
    #[must_use]
    pub fn config_path(&self) -> &str {
        self.k8s_config_path.as_deref().unwrap_or_default()
    }
}
