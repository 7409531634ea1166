//! SPIRE server node attestor for Istio node agents.
//!
//! The agent presents a Kubernetes service account token. The attestor asks
//! the Kubernetes `TokenReview` API whether the token is authentic, checks
//! that it belongs to a service account, and answers with a base SPIFFE ID of
//! the form `spiffe://<trust domain>/ns/<namespace>/sa/<service account>`.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use istio_attestor::{channel, AttestationData, AttestationRequest, IstioAttestor};
//!
//! #[tokio::main]
//! async fn main() -> istio_attestor::Result<()> {
//!     let attestor = IstioAttestor::new();
//!     attestor.configure(r#"k8s_config_path = "/etc/spire/kubeconfig""#)?;
//!
//!     let (mut stream, mut peer) = channel();
//!     let payload = br#"{"token":"Bearer eyJhbG...","trustDomain":"example.org"}"#;
//!     peer.send(AttestationRequest::new(AttestationData::new("istio", payload.to_vec())))
//!         .await?;
//!
//!     attestor.attest(&mut stream).await?;
//!     println!("{:?}", peer.recv().await);
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Uses rustls for TLS
//! - `rustls` - Use rustls for TLS (recommended)
//! - `native-tls` - Use system native TLS

#![doc(html_root_url = "https://docs.rs/istio-attestor/0.1.0")]

mod attestor;
mod config;
mod manager;
mod stream;
mod verifier;

#[cfg(test)]
mod test_support;

pub use attestor::{base_spiffe_id, IstioAttestor, PLUGIN_NAME};
pub use config::AttestorConfig;
pub use manager::{ClientFactory, ClientManager, KubeClientFactory};
pub use stream::{channel, AttestStream, ChannelPeer, ChannelStream};
pub use verifier::{claims_from_status, strip_bearer, TokenVerifier, SERVICE_ACCOUNTS_GROUP};

// Re-export core types
pub use istio_attestor_core::*;

// Re-export the backend client
pub use istio_attestor_kube::{KubeClient, KubeClientBuilder, KubeConfig, TokenReviewer};
