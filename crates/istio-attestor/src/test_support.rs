//! Fakes shared by unit tests.

use crate::manager::ClientFactory;
use async_trait::async_trait;
use istio_attestor_core::{AttestorError, Result, TokenReviewStatus, UserInfo};
use istio_attestor_kube::TokenReviewer;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) enum Reply {
    Status(TokenReviewStatus),
    Unavailable(String),
}

/// Reviewer that answers every token with the same reply
pub(crate) struct StaticReviewer {
    reply: Reply,
    calls: AtomicUsize,
    last_token: Mutex<Option<String>>,
}

impl StaticReviewer {
    pub(crate) fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            last_token: Mutex::new(None),
        })
    }

    pub(crate) fn with_status(status: TokenReviewStatus) -> Arc<Self> {
        Self::new(Reply::Status(status))
    }

    /// An authenticated service account with the given username
    pub(crate) fn authenticated(username: &str) -> Arc<Self> {
        Self::with_status(service_account_status(username))
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_token(&self) -> Option<String> {
        self.last_token.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenReviewer for StaticReviewer {
    async fn create_token_review(&self, token: &str) -> Result<TokenReviewStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock().unwrap() = Some(token.to_string());
        match &self.reply {
            Reply::Status(status) => Ok(status.clone()),
            Reply::Unavailable(message) => Err(AttestorError::Http(message.clone())),
        }
    }
}

/// Status the API server returns for a valid service account token
pub(crate) fn service_account_status(username: &str) -> TokenReviewStatus {
    TokenReviewStatus {
        authenticated: true,
        user: UserInfo {
            username: username.to_string(),
            uid: "0b6e8a4c-6a2f-4d1e-9d61-2f0c4b8e7a11".to_string(),
            groups: vec![
                "system:serviceaccounts".to_string(),
                "system:serviceaccounts:payments".to_string(),
                "system:authenticated".to_string(),
            ],
            ..UserInfo::default()
        },
        ..TokenReviewStatus::default()
    }
}

/// Factory that hands out a fixed reviewer per config path
#[derive(Default)]
pub(crate) struct PathFactory {
    reviewers: HashMap<String, Arc<dyn TokenReviewer>>,
}

impl PathFactory {
    pub(crate) fn with(mut self, path: &str, reviewer: Arc<StaticReviewer>) -> Self {
        self.reviewers.insert(path.to_string(), reviewer);
        self
    }
}

impl ClientFactory for PathFactory {
    fn build(&self, config_path: &str) -> Result<Arc<dyn TokenReviewer>> {
        self.reviewers
            .get(config_path)
            .cloned()
            .ok_or_else(|| AttestorError::Config(format!("no cluster at {config_path:?}")))
    }
}
