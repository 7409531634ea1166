//! `authentication.k8s.io/v1` `TokenReview` wire types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// API group version of token reviews
pub const TOKEN_REVIEW_API_VERSION: &str = "authentication.k8s.io/v1";

/// Kind of token review objects
pub const TOKEN_REVIEW_KIND: &str = "TokenReview";

/// A request to authenticate a token, and the API server's answer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenReview {
    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub kind: String,

    pub spec: TokenReviewSpec,

    /// Filled in by the API server; absent on requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TokenReviewStatus>,
}

impl TokenReview {
    /// Build a review request for the given token
    #[must_use]
    pub fn for_token(token: impl Into<String>) -> Self {
        Self {
            api_version: TOKEN_REVIEW_API_VERSION.to_string(),
            kind: TOKEN_REVIEW_KIND.to_string(),
            spec: TokenReviewSpec {
                token: token.into(),
                audiences: Vec::new(),
            },
            status: None,
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenReviewSpec {
    #[serde(default)]
    pub token: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audiences: Vec<String>,
}

// Keeps bearer tokens out of debug output and logs.
impl std::fmt::Debug for TokenReviewSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenReviewSpec")
            .field("token", &"<redacted>")
            .field("audiences", &self.audiences)
            .finish()
    }
}

/// Result of a token review
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenReviewStatus {
    /// Whether the token was authenticated
    #[serde(default)]
    pub authenticated: bool,

    /// Authenticated user, meaningful only when `authenticated` is set
    #[serde(default)]
    pub user: UserInfo,

    /// Audiences the token is valid for
    #[serde(default)]
    pub audiences: Vec<String>,

    /// Error encountered while reviewing the token
    #[serde(default)]
    pub error: String,
}

/// User information returned by a token review
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub uid: String,

    #[serde(default)]
    pub groups: Vec<String>,

    #[serde(default)]
    pub extra: BTreeMap<String, Vec<String>>,
}
