//! The Istio node attestor plugin.

use crate::config::AttestorConfig;
use crate::manager::ClientManager;
use crate::stream::AttestStream;
use crate::verifier::TokenVerifier;
use istio_attestor_core::{
    AttestationResponse, AttestedData, AttestorError, Claims, PluginInfo, Result,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Attestation data type handled by this attestor
pub const PLUGIN_NAME: &str = "istio";

/// Base SPIFFE ID for a verified service account.
///
/// The parts are substituted as-is.
#[must_use]
pub fn base_spiffe_id(trust_domain: &str, claims: &Claims) -> String {
    format!(
        "spiffe://{trust_domain}/ns/{}/sa/{}",
        claims.namespace, claims.service_account
    )
}

/// Server-side node attestor for Istio node agents
#[derive(Debug, Clone)]
pub struct IstioAttestor {
    clients: Arc<ClientManager>,
    verifier: TokenVerifier,
}

impl Default for IstioAttestor {
    fn default() -> Self {
        Self::new()
    }
}

impl IstioAttestor {
    /// Create an unconfigured attestor
    #[must_use]
    pub fn new() -> Self {
        Self::with_client_manager(Arc::new(ClientManager::new()))
    }

    /// Create an attestor backed by the given client manager
    #[must_use]
    pub fn with_client_manager(clients: Arc<ClientManager>) -> Self {
        let verifier = TokenVerifier::new(Arc::clone(&clients));
        Self { clients, verifier }
    }

    /// Apply a plugin configuration document.
    ///
    /// Safe to call while attestations are in flight; they finish with the
    /// client they started with.
    pub fn configure(&self, configuration: &str) -> Result<()> {
        let config = AttestorConfig::parse(configuration)?;
        self.clients.configure(config.config_path())?;

        if config.config_path().is_empty() {
            info!("configured with in-cluster credentials");
        } else {
            info!(k8s_config_path = %config.config_path(), "configured with kubeconfig");
        }
        Ok(())
    }

    /// Run one attestation exchange: receive a request, verify its token,
    /// send the base SPIFFE ID.
    ///
    /// Any failure ends the exchange with an error and nothing is sent.
    #[instrument(skip_all)]
    pub async fn attest<S>(&self, stream: &mut S) -> Result<()>
    where
        S: AttestStream + ?Sized,
    {
        let request = stream.recv().await?;

        let data = &request.attestation_data;
        if data.data_type != PLUGIN_NAME {
            warn!(data_type = %data.data_type, "unexpected attestation data type");
            return Err(AttestorError::UnexpectedAttestationType(
                data.data_type.clone(),
            ));
        }

        let attested: AttestedData =
            serde_json::from_slice(&data.data).map_err(AttestorError::InvalidAttestationData)?;

        let claims = self.verifier.verify(&attested.token).await.map_err(|e| {
            warn!(error = %e, "token verification failed");
            AttestorError::InvalidToken(Box::new(e))
        })?;

        let spiffe_id = base_spiffe_id(&attested.trust_domain, &claims);
        info!(spiffe_id = %spiffe_id, "attested Istio node agent");

        stream
            .send(AttestationResponse {
                valid: true,
                base_spiffe_id: spiffe_id,
            })
            .await
    }

    /// Static plugin metadata
    #[must_use]
    pub fn plugin_info(&self) -> PluginInfo {
        PluginInfo {
            name: PLUGIN_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
