//! `authentication.k8s.io/v1` endpoints.

use crate::KubeClient;
use istio_attestor_core::{Result, TokenReview};
use tracing::instrument;

const TOKEN_REVIEWS_PATH: &str = "/apis/authentication.k8s.io/v1/tokenreviews";

/// Authentication API endpoints
pub struct AuthenticationApi<'a> {
    client: &'a KubeClient,
}

impl<'a> AuthenticationApi<'a> {
    pub(crate) const fn new(client: &'a KubeClient) -> Self {
        Self { client }
    }

    /// Submit a token review and return the API server's answer
    #[instrument(skip_all, fields(server = %self.client.server()))]
    pub async fn create_token_review(&self, review: &TokenReview) -> Result<TokenReview> {
        self.client.post(TOKEN_REVIEWS_PATH, review).await
    }
}
