//! Cluster connection settings.
//!
//! A [`KubeConfig`] comes from one of two sources, chosen by the configured
//! path alone: an empty path means in-cluster service account credentials,
//! anything else is read as a kubeconfig file. A failing kubeconfig never
//! falls back to in-cluster credentials.

use base64::Engine as _;
use istio_attestor_core::{AttestorError, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory where the kubelet mounts the pod's service account credentials
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

const SERVICE_HOST_ENV: &str = "KUBERNETES_SERVICE_HOST";
const SERVICE_PORT_ENV: &str = "KUBERNETES_SERVICE_PORT";

/// How requests to the API server authenticate
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// No request-level credentials
    None,
    /// Static bearer token
    Bearer(String),
    /// Bearer token re-read from a file on every request
    BearerFile(PathBuf),
    /// HTTP basic authentication
    Basic { username: String, password: String },
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Self::BearerFile(path) => f.debug_tuple("BearerFile").field(path).finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// PEM-encoded TLS client certificate and key
#[derive(Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("cert_pem", &format_args!("{} bytes", self.cert_pem.len()))
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

/// Everything needed to talk to one Kubernetes API server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeConfig {
    /// API server base URL, e.g. `https://10.0.0.1:443`
    pub server: String,

    /// PEM bundle of certificate authorities to trust for the server
    pub ca_pem: Option<Vec<u8>>,

    /// Skip server certificate verification
    pub insecure_skip_tls_verify: bool,

    /// Request authentication
    pub auth: Auth,

    /// TLS client certificate
    pub identity: Option<ClientIdentity>,
}

impl KubeConfig {
    /// Load settings for `config_path`: in-cluster when empty, otherwise the
    /// kubeconfig file at that path.
    pub fn load(config_path: &str) -> Result<Self> {
        if config_path.is_empty() {
            Self::in_cluster()
        } else {
            Self::from_kubeconfig(Path::new(config_path))
        }
    }

    /// Settings from the pod environment and its mounted service account
    pub fn in_cluster() -> Result<Self> {
        Self::in_cluster_from(
            std::env::var(SERVICE_HOST_ENV).ok(),
            std::env::var(SERVICE_PORT_ENV).ok(),
            Path::new(SERVICE_ACCOUNT_DIR),
        )
    }

    pub(crate) fn in_cluster_from(
        host: Option<String>,
        port: Option<String>,
        account_dir: &Path,
    ) -> Result<Self> {
        let (host, port) = match (host, port) {
            (Some(host), Some(port)) if !host.is_empty() && !port.is_empty() => (host, port),
            _ => {
                return Err(AttestorError::Config(format!(
                    "unable to load in-cluster configuration, {SERVICE_HOST_ENV} and {SERVICE_PORT_ENV} must be defined"
                )))
            }
        };

        let token_path = account_dir.join("token");
        std::fs::metadata(&token_path).map_err(|e| {
            AttestorError::Config(format!(
                "reading service account token {}: {e}",
                token_path.display()
            ))
        })?;

        let ca_path = account_dir.join("ca.crt");
        let ca_pem = match std::fs::read(&ca_path) {
            Ok(pem) => Some(pem),
            Err(e) => {
                warn!(path = %ca_path.display(), error = %e, "expected to load root CA config, continuing without it");
                None
            }
        };

        let server = if host.contains(':') {
            format!("https://[{host}]:{port}")
        } else {
            format!("https://{host}:{port}")
        };
        debug!(server = %server, "using in-cluster configuration");

        Ok(Self {
            server,
            ca_pem,
            insecure_skip_tls_verify: false,
            auth: Auth::BearerFile(token_path),
            identity: None,
        })
    }

    /// Settings for the current context of a kubeconfig file
    pub fn from_kubeconfig(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AttestorError::Config(format!("reading kubeconfig {}: {e}", path.display()))
        })?;
        let raw: RawKubeconfig = serde_yaml::from_str(&content).map_err(|e| {
            AttestorError::Config(format!("parsing kubeconfig {}: {e}", path.display()))
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        let config = raw.resolve(base_dir)?;
        debug!(
            kubeconfig = %path.display(),
            server = %config.server,
            "using kubeconfig configuration"
        );
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawKubeconfig {
    #[serde(default)]
    current_context: String,
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    contexts: Vec<NamedContext>,
    #[serde(default)]
    users: Vec<NamedUser>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: RawCluster,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawCluster {
    #[serde(default)]
    server: String,
    certificate_authority: Option<String>,
    certificate_authority_data: Option<String>,
    #[serde(default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: RawContext,
}

#[derive(Debug, Deserialize)]
struct RawContext {
    cluster: String,
    #[serde(default)]
    user: String,
}

#[derive(Debug, Deserialize)]
struct NamedUser {
    name: String,
    #[serde(default)]
    user: RawUser,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawUser {
    token: Option<String>,
    #[serde(rename = "tokenFile")]
    token_file: Option<String>,
    client_certificate: Option<String>,
    client_certificate_data: Option<String>,
    client_key: Option<String>,
    client_key_data: Option<String>,
    username: Option<String>,
    password: Option<String>,
    exec: Option<serde_yaml::Value>,
    auth_provider: Option<serde_yaml::Value>,
}

impl RawKubeconfig {
    fn resolve(self, base_dir: &Path) -> Result<KubeConfig> {
        if self.current_context.is_empty() {
            return Err(AttestorError::Config(
                "kubeconfig has no current-context".into(),
            ));
        }
        let context = self
            .contexts
            .into_iter()
            .find(|c| c.name == self.current_context)
            .ok_or_else(|| {
                AttestorError::Config(format!(
                    "context {:?} not found in kubeconfig",
                    self.current_context
                ))
            })?
            .context;

        let cluster = self
            .clusters
            .into_iter()
            .find(|c| c.name == context.cluster)
            .ok_or_else(|| {
                AttestorError::Config(format!(
                    "cluster {:?} not found in kubeconfig",
                    context.cluster
                ))
            })?
            .cluster;

        if cluster.server.is_empty() {
            return Err(AttestorError::Config(format!(
                "cluster {:?} has no server",
                context.cluster
            )));
        }

        let user = if context.user.is_empty() {
            RawUser::default()
        } else {
            self.users
                .into_iter()
                .find(|u| u.name == context.user)
                .ok_or_else(|| {
                    AttestorError::Config(format!(
                        "user {:?} not found in kubeconfig",
                        context.user
                    ))
                })?
                .user
        };

        let ca_pem = inline_or_file(
            cluster.certificate_authority_data.as_deref(),
            cluster.certificate_authority.as_deref(),
            base_dir,
            "certificate-authority",
        )?;

        Ok(KubeConfig {
            server: cluster.server,
            ca_pem,
            insecure_skip_tls_verify: cluster.insecure_skip_tls_verify,
            auth: user.auth(base_dir)?,
            identity: user.identity(base_dir)?,
        })
    }
}

impl RawUser {
    fn auth(&self, base_dir: &Path) -> Result<Auth> {
        if self.exec.is_some() || self.auth_provider.is_some() {
            return Err(AttestorError::Config(
                "kubeconfig exec and auth-provider credential plugins are not supported".into(),
            ));
        }

        if let Some(token) = self.token.as_ref().filter(|t| !t.is_empty()) {
            return Ok(Auth::Bearer(token.clone()));
        }
        if let Some(file) = self.token_file.as_deref().filter(|f| !f.is_empty()) {
            return Ok(Auth::BearerFile(resolve_path(base_dir, file)));
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) if !username.is_empty() => Ok(Auth::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Ok(Auth::None),
        }
    }

    fn identity(&self, base_dir: &Path) -> Result<Option<ClientIdentity>> {
        let cert = inline_or_file(
            self.client_certificate_data.as_deref(),
            self.client_certificate.as_deref(),
            base_dir,
            "client-certificate",
        )?;
        let key = inline_or_file(
            self.client_key_data.as_deref(),
            self.client_key.as_deref(),
            base_dir,
            "client-key",
        )?;

        match (cert, key) {
            (Some(cert_pem), Some(key_pem)) => Ok(Some(ClientIdentity { cert_pem, key_pem })),
            (None, None) => Ok(None),
            _ => Err(AttestorError::Config(
                "client-certificate and client-key must be set together".into(),
            )),
        }
    }
}

/// Read a PEM blob from inline base64 data, else from a file path.
fn inline_or_file(
    data: Option<&str>,
    file: Option<&str>,
    base_dir: &Path,
    field: &str,
) -> Result<Option<Vec<u8>>> {
    if let Some(data) = data.filter(|d| !d.is_empty()) {
        let compact: String = data.split_whitespace().collect();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| AttestorError::Config(format!("decoding {field}-data: {e}")))?;
        return Ok(Some(decoded));
    }

    if let Some(file) = file.filter(|f| !f.is_empty()) {
        let path = resolve_path(base_dir, file);
        let pem = std::fs::read(&path).map_err(|e| {
            AttestorError::Config(format!("reading {field} {}: {e}", path.display()))
        })?;
        return Ok(Some(pem));
    }

    Ok(None)
}

fn resolve_path(base_dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
