//! Backend contract for token verification.

use crate::KubeClient;
use async_trait::async_trait;
use istio_attestor_core::{Result, TokenReview, TokenReviewStatus};
use tracing::debug;

/// Something that can authenticate a bearer token and report its principal.
///
/// [`KubeClient`] implements this against the Kubernetes `TokenReview` API.
#[async_trait]
pub trait TokenReviewer: Send + Sync {
    /// Review `token` and return the review status.
    ///
    /// Errors mean no review was obtained; a rejected token is reported in
    /// the returned status.
    async fn create_token_review(&self, token: &str) -> Result<TokenReviewStatus>;
}

#[async_trait]
impl TokenReviewer for KubeClient {
    async fn create_token_review(&self, token: &str) -> Result<TokenReviewStatus> {
        let review = self
            .authentication()
            .create_token_review(&TokenReview::for_token(token))
            .await?;

        if review.status.is_none() {
            debug!("token review response has no status");
        }
        Ok(review.status.unwrap_or_default())
    }
}
