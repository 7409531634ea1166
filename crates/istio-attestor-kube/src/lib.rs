//! Kubernetes `TokenReview` client for the Istio node attestor.
//!
//! This crate provides [`KubeClient`], a small HTTPS client for the parts of
//! the Kubernetes API the attestor needs, and the [`TokenReviewer`] trait the
//! verifier is written against.
//!
//! # Example
//!
//! ```rust,ignore
//! use istio_attestor_kube::{KubeClient, TokenReviewer};
//!
//! # async fn example() -> istio_attestor_core::Result<()> {
//! // An empty path selects in-cluster credentials
//! let client = KubeClient::from_config_path("")?;
//! let status = client.create_token_review("eyJhbG...").await?;
//! println!("authenticated: {}", status.authenticated);
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/istio-attestor-kube/0.1.0")]

mod client;
mod config;
mod reviewer;
pub mod api;

pub use client::{KubeClient, KubeClientBuilder};
pub use config::*;
pub use istio_attestor_core::{AttestorError, Result};
pub use reviewer::TokenReviewer;
