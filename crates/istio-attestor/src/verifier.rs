//! Service account token verification.

use crate::manager::ClientManager;
use istio_attestor_core::{AttestorError, Claims, Result, TokenReviewStatus};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Group every Kubernetes service account belongs to
pub const SERVICE_ACCOUNTS_GROUP: &str = "system:serviceaccounts";

const BEARER_PREFIX: &str = "Bearer ";

/// Remove one leading `Bearer ` (case-sensitive) from a token.
#[must_use]
pub fn strip_bearer(token: &str) -> &str {
    token.strip_prefix(BEARER_PREFIX).unwrap_or(token)
}

/// Verifies bearer tokens with the Kubernetes `TokenReview` API
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    clients: Arc<ClientManager>,
}

impl TokenVerifier {
    #[must_use]
    pub const fn new(clients: Arc<ClientManager>) -> Self {
        Self { clients }
    }

    /// Verify `raw_token` and return the service account it was issued to.
    ///
    /// Backend errors are returned as-is; nothing is retried.
    #[instrument(skip_all)]
    pub async fn verify(&self, raw_token: &str) -> Result<Claims> {
        let token = strip_bearer(raw_token);
        let client = self.clients.client()?;

        let status = client.create_token_review(token).await?;
        let claims = claims_from_status(&status)?;

        debug!(
            namespace = %claims.namespace,
            service_account = %claims.service_account,
            "token review authenticated service account"
        );
        Ok(claims)
    }
}

/// Interpret a token review status.
///
/// Checks run in order: status error, authenticated flag, service accounts
/// group, then the `system:serviceaccount:<namespace>:<name>` username.
pub fn claims_from_status(status: &TokenReviewStatus) -> Result<Claims> {
    if !status.error.is_empty() {
        return Err(AttestorError::AuthenticationStatus(status.error.clone()));
    }

    if !status.authenticated {
        return Err(AttestorError::NotAuthenticated);
    }

    if !status.user.groups.iter().any(|g| g == SERVICE_ACCOUNTS_GROUP) {
        return Err(AttestorError::NotServiceAccount);
    }

    parse_username(&status.user.username)
}

// Only the segment count is checked; the first two segments are not compared
// against "system" and "serviceaccount".
fn parse_username(username: &str) -> Result<Claims> {
    let invalid = || AttestorError::InvalidUsername(username.to_string());

    let segments: Vec<&str> = username.split(':').collect();
    let [_, _, namespace, service_account] = segments.as_slice() else {
        return Err(invalid());
    };
    if namespace.is_empty() || service_account.is_empty() {
        return Err(invalid());
    }

    Ok(Claims::new(*namespace, *service_account))
}
