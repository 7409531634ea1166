use thiserror::Error;

/// Result type alias for attestor operations
pub type Result<T> = std::result::Result<T, AttestorError>;

/// Errors that can occur while configuring the attestor or attesting a node
#[derive(Error, Debug)]
pub enum AttestorError {
    /// Plugin configuration is malformed or the backend client could not be built
    #[error("configuration error: {0}")]
    Config(String),

    /// Verification was attempted before any successful configuration
    #[error("no Kubernetes client is configured")]
    NotConfigured,

    /// The request was addressed to a different attestor
    #[error("unexpected attestation data type {0:?}")]
    UnexpectedAttestationType(String),

    /// The attestation payload is not a valid attested-data document
    #[error("error parsing message from attestation data: {0}")]
    InvalidAttestationData(#[source] serde_json::Error),

    /// Transport failure talking to the Kubernetes API
    #[error("could not get a token review response: {0}")]
    Http(String),

    /// The Kubernetes API answered with a non-success status
    #[error("could not get a token review response: API error ({code}): {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message from the API
        message: String,
    },

    /// The Kubernetes API returned a body that is not a token review
    #[error("could not decode token review response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The token review status carried an error string
    #[error("service account authentication status error: {0}")]
    AuthenticationStatus(String),

    /// The token review did not authenticate the token
    #[error("token is not authenticated")]
    NotAuthenticated,

    /// The authenticated user is not in the service accounts group
    #[error("the token is not a service account")]
    NotServiceAccount,

    /// The authenticated username is not `system:serviceaccount:<ns>:<sa>`
    #[error("token review returned an invalid username field: {0:?}")]
    InvalidUsername(String),

    /// Token verification failed while attesting
    #[error("provided token from request is not valid: {0}")]
    InvalidToken(#[source] Box<AttestorError>),

    /// Receiving from or sending on the attestation stream failed
    #[error("attestation stream error: {0}")]
    Stream(String),
}

/// Failure classes of the attestation protocol.
///
/// Several [`AttestorError`] variants can belong to one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    NotConfigured,
    MalformedRequest,
    BackendUnavailable,
    AuthenticationStatus,
    NotAuthenticated,
    NotServiceAccount,
    InvalidUsernameFormat,
    Transport,
}

impl AttestorError {
    /// Returns the failure class of this error.
    ///
    /// Wrapped verification failures report the class of their cause.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::NotConfigured => ErrorKind::NotConfigured,
            Self::UnexpectedAttestationType(_) | Self::InvalidAttestationData(_) => {
                ErrorKind::MalformedRequest
            }
            Self::Http(_) | Self::Api { .. } | Self::Decode(_) => ErrorKind::BackendUnavailable,
            Self::AuthenticationStatus(_) => ErrorKind::AuthenticationStatus,
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::NotServiceAccount => ErrorKind::NotServiceAccount,
            Self::InvalidUsername(_) => ErrorKind::InvalidUsernameFormat,
            Self::InvalidToken(inner) => inner.kind(),
            Self::Stream(_) => ErrorKind::Transport,
        }
    }

    /// Returns true if the Kubernetes API could not produce a token review
    #[must_use]
    pub fn is_backend_error(&self) -> bool {
        self.kind() == ErrorKind::BackendUnavailable
    }

    /// Returns the HTTP status code if this is an API error
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}
