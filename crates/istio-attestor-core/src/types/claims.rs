use serde::{Deserialize, Serialize};

/// Identity proven by a verified service account token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claims {
    /// Kubernetes namespace of the service account
    pub namespace: String,

    /// Service account name
    pub service_account: String,
}

impl Claims {
    #[must_use]
    pub fn new(namespace: impl Into<String>, service_account: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            service_account: service_account.into(),
        }
    }
}

/// Static identity of the attestor plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
}
