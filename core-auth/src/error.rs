use bridge_traits::BridgeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ERROR_NO_USER_SIGNED_IN: &str = "No user is signed in.";
pub const ERROR_SIGN_IN_FAILED: &str = "signIn failed.";
pub const ERROR_CUSTOM_TOKEN_SKIP_NATIVE_AUTH: &str =
    "signInWithCustomToken cannot be used in combination with skipNativeAuth.";
pub const ERROR_EMAIL_SIGN_IN_SKIP_NATIVE_AUTH: &str =
    "createUserWithEmailAndPassword and signInWithEmailAndPassword cannot be used in combination with skipNativeAuth.";

/// Parameter description used when phone sign-in gets neither form of input.
pub const PHONE_SIGN_IN_PARAMETERS: &str = "phoneNumber or verificationId and verificationCode";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0} must be provided.")]
    MissingParameter(String),

    #[error("{name} must be {expected}.")]
    InvalidParameter { name: String, expected: &'static str },

    #[error("Method {0} is not implemented.")]
    UnknownMethod(String),

    #[error("No user is signed in.")]
    NoUserSignedIn,

    #[error("{0}")]
    ConfigurationConflict(&'static str),

    #[error("Provider {0} is not enabled.")]
    UnsupportedProvider(String),

    #[error("sign-in with {provider} is already in progress.")]
    FlowInProgress { provider: String },

    #[error("sign-in with {provider} was cancelled.")]
    Cancelled { provider: String },

    #[error("sign-in with {provider} timed out after {seconds}s.")]
    Timeout { provider: String, seconds: u64 },

    /// Message reported by the identity SDK or a provider SDK, unchanged.
    #[error("{0}")]
    Provider(String),

    #[error(transparent)]
    Bridge(BridgeError),

    #[error(transparent)]
    Config(#[from] core_runtime::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<BridgeError> for AuthError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Rejected(message) => AuthError::Provider(message),
            other => AuthError::Bridge(other),
        }
    }
}

/// Coarse classification of a failed call.
///
/// The wire format only carries the message; the kind lets Rust callers
/// branch without matching on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// A required parameter was missing or malformed, or the method is unknown
    Validation,
    /// The call needs state that is not there (no signed-in user, a flow
    /// already running)
    Precondition,
    /// The call contradicts the bridge configuration (`skipNativeAuth`)
    ConfigurationConflict,
    /// The provider is not in the configured providers list
    UnsupportedProvider,
    /// The SDK or provider rejected the operation
    Provider,
    /// The user backed out of the provider flow
    Cancelled,
    /// The provider flow never reported back
    Timeout,
    /// Fault inside the bridge itself
    Internal,
}

impl AuthError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AuthError::MissingParameter(_)
            | AuthError::InvalidParameter { .. }
            | AuthError::UnknownMethod(_) => FailureKind::Validation,
            AuthError::NoUserSignedIn | AuthError::FlowInProgress { .. } => {
                FailureKind::Precondition
            }
            AuthError::ConfigurationConflict(_) => FailureKind::ConfigurationConflict,
            AuthError::UnsupportedProvider(_) => FailureKind::UnsupportedProvider,
            AuthError::Cancelled { .. } => FailureKind::Cancelled,
            AuthError::Timeout { .. } => FailureKind::Timeout,
            AuthError::Provider(_) | AuthError::Bridge(_) => FailureKind::Provider,
            AuthError::Config(_) | AuthError::Internal(_) => FailureKind::Internal,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AuthError::Cancelled { .. })
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
