//! Kubernetes API client implementation.

use crate::api::AuthenticationApi;
use crate::config::{Auth, KubeConfig};
use istio_attestor_core::{AttestorError, Result};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Minimal Kubernetes API client
#[derive(Clone)]
pub struct KubeClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    server: String,
    auth: Auth,
}

impl std::fmt::Debug for KubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClient")
            .field("server", &self.inner.server)
            .field("auth", &self.inner.auth)
            .finish_non_exhaustive()
    }
}

impl KubeClient {
    /// Create a client for the given cluster settings
    pub fn new(config: KubeConfig) -> Result<Self> {
        KubeClientBuilder::new(config).build()
    }

    /// Create a client from a kubeconfig path, or in-cluster settings when
    /// the path is empty
    pub fn from_config_path(config_path: &str) -> Result<Self> {
        Self::new(KubeConfig::load(config_path)?)
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder(config: KubeConfig) -> KubeClientBuilder {
        KubeClientBuilder::new(config)
    }

    /// Access `authentication.k8s.io` endpoints
    #[must_use]
    pub fn authentication(&self) -> AuthenticationApi<'_> {
        AuthenticationApi::new(self)
    }

    /// API server base URL
    #[must_use]
    pub fn server(&self) -> &str {
        &self.inner.server
    }

    /// Perform a POST request with JSON body
    pub(crate) async fn post<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.build_url(path)?;
        debug!(url = %url, "POST request");

        let request = self.inner.http.post(url).json(body);
        let response = self
            .authorize(request)
            .await?
            .send()
            .await
            .map_err(|e| AttestorError::Http(e.to_string()))?;

        Self::handle_response(response).await
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        let url = format!("{}{}", self.inner.server, path);
        Url::parse(&url).map_err(|e| AttestorError::Http(format!("invalid URL {url}: {e}")))
    }

    /// Attach request credentials
    async fn authorize(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        match &self.inner.auth {
            Auth::None => Ok(request),
            Auth::Bearer(token) => Ok(request.bearer_auth(token)),
            Auth::BearerFile(path) => {
                let token = tokio::fs::read_to_string(path).await.map_err(|e| {
                    AttestorError::Http(format!("reading bearer token {}: {e}", path.display()))
                })?;
                Ok(request.bearer_auth(token.trim()))
            }
            Auth::Basic { username, password } => Ok(request.basic_auth(username, Some(password))),
        }
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| AttestorError::Http(e.to_string()))?;
            serde_json::from_str(&body).map_err(AttestorError::Decode)
        } else {
            Self::handle_error(status.as_u16(), response).await
        }
    }

    /// Convert an error response, preferring the message of a `Status` body
    async fn handle_error<T>(status: u16, response: reqwest::Response) -> Result<T> {
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or(body);

        warn!(status, message = %message, "Kubernetes API request failed");
        Err(AttestorError::Api {
            code: status,
            message,
        })
    }
}

/// Builder for configuring a [`KubeClient`]
pub struct KubeClientBuilder {
    config: KubeConfig,
    timeout: Option<Duration>,
    user_agent: String,
}

impl KubeClientBuilder {
    /// Create a new builder for the given cluster settings
    #[must_use]
    pub fn new(config: KubeConfig) -> Self {
        Self {
            config,
            timeout: None,
            user_agent: format!("istio-attestor/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set a request timeout. Requests have no timeout unless one is set.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Build the client. No request is sent to the API server.
    pub fn build(self) -> Result<KubeClient> {
        let server = self.config.server.trim_end_matches('/').to_string();
        Url::parse(&server)
            .map_err(|e| AttestorError::Config(format!("invalid server URL {server:?}: {e}")))?;

        let mut builder = HttpClient::builder()
            .user_agent(&self.user_agent)
            .gzip(true);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder = tls::apply(builder, &self.config)?;

        let http = builder
            .build()
            .map_err(|e| AttestorError::Config(format!("error creating HTTP client: {e}")))?;

        Ok(KubeClient {
            inner: Arc::new(ClientInner {
                http,
                server,
                auth: self.config.auth,
            }),
        })
    }
}

#[cfg(any(feature = "rustls", feature = "native-tls"))]
mod tls {
    use crate::config::KubeConfig;
    use istio_attestor_core::{AttestorError, Result};
    use reqwest::{Certificate, ClientBuilder, Identity};

    pub(super) fn apply(mut builder: ClientBuilder, config: &KubeConfig) -> Result<ClientBuilder> {
        if let Some(ca_pem) = &config.ca_pem {
            let ca = Certificate::from_pem(ca_pem)
                .map_err(|e| AttestorError::Config(format!("invalid certificate authority: {e}")))?;
            builder = builder.add_root_certificate(ca);
        }

        if config.insecure_skip_tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(identity) = &config.identity {
            builder = builder.identity(client_identity(&identity.cert_pem, &identity.key_pem)?);
        }

        Ok(builder)
    }

    #[cfg(feature = "rustls")]
    fn client_identity(cert_pem: &[u8], key_pem: &[u8]) -> Result<Identity> {
        let mut pem = key_pem.to_vec();
        pem.push(b'\n');
        pem.extend_from_slice(cert_pem);
        Identity::from_pem(&pem)
            .map_err(|e| AttestorError::Config(format!("invalid client certificate: {e}")))
    }

    #[cfg(not(feature = "rustls"))]
    fn client_identity(cert_pem: &[u8], key_pem: &[u8]) -> Result<Identity> {
        Identity::from_pkcs8_pem(cert_pem, key_pem)
            .map_err(|e| AttestorError::Config(format!("invalid client certificate: {e}")))
    }
}

#[cfg(not(any(feature = "rustls", feature = "native-tls")))]
mod tls {
    use crate::config::KubeConfig;
    use istio_attestor_core::{AttestorError, Result};
    use reqwest::ClientBuilder;

    pub(super) fn apply(builder: ClientBuilder, config: &KubeConfig) -> Result<ClientBuilder> {
        if config.ca_pem.is_some() || config.identity.is_some() || config.insecure_skip_tls_verify
        {
            return Err(AttestorError::Config(
                "TLS settings require the rustls or native-tls feature".into(),
            ));
        }
        Ok(builder)
    }
}
