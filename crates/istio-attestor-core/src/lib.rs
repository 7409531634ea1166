//! Core types and errors for the Istio node attestor.
//!
//! This crate provides the foundational types shared by the attestor crates:
//!
//! - **Types**: attestation exchange messages, the `TokenReview` wire model
//!   and the verified [`Claims`]
//! - **Errors**: the attestation error taxonomy in [`AttestorError`]
//!
//! # Example
//!
//! ```rust,ignore
//! use istio_attestor_core::{AttestorError, Claims, ErrorKind};
//!
//! fn describe(result: Result<Claims, AttestorError>) -> String {
//!     match result {
//!         Ok(claims) => format!("{}/{}", claims.namespace, claims.service_account),
//!         Err(e) if e.kind() == ErrorKind::NotAuthenticated => "rejected".into(),
//!         Err(e) => e.to_string(),
//!     }
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/istio-attestor-core/0.1.0")]

mod error;
pub mod types;

pub use error::{AttestorError, ErrorKind, Result};
pub use types::*;
