//! Identity SDK Abstractions
//!
//! The contract between the bridge core and the platform-native identity SDK
//! (Firebase Auth on Android/iOS, or any SDK with the same shape). The SDK is
//! assumed correct; the core only orchestrates calls into it and reads user
//! handles back out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Provider linkage attached to a native user (one entry per linked provider).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeUserInfo {
    /// Provider identifier, e.g. `google.com` or `password`
    pub provider_id: String,
    /// The user's identifier at that provider
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub photo_url: Option<String>,
}

/// Opaque handle to the SDK's signed-in user.
///
/// Accessors read the SDK's in-memory state and never hit the network. The
/// async methods are the per-user operations the SDK exposes on its user
/// object.
#[async_trait]
pub trait NativeUser: Send + Sync {
    fn uid(&self) -> String;

    fn email(&self) -> Option<String>;

    fn display_name(&self) -> Option<String>;

    fn phone_number(&self) -> Option<String>;

    fn photo_url(&self) -> Option<String>;

    /// Provider that created the session (usually `firebase`)
    fn provider_id(&self) -> String;

    fn tenant_id(&self) -> Option<String>;

    fn is_email_verified(&self) -> bool;

    fn is_anonymous(&self) -> bool;

    fn provider_data(&self) -> Vec<NativeUserInfo>;

    /// ID token cached by the SDK for this user, if it has one.
    fn cached_id_token(&self) -> Option<String> {
        None
    }

    /// Fetch an ID token, refreshing it first when `force_refresh` is set.
    async fn get_id_token(&self, force_refresh: bool) -> Result<String>;

    async fn send_email_verification(&self) -> Result<()>;

    async fn update_email(&self, new_email: &str) -> Result<()>;

    async fn update_password(&self, new_password: &str) -> Result<()>;
}

/// Shared handle to a native user.
pub type NativeUserHandle = Arc<dyn NativeUser>;

/// Credential material exchanged with the SDK for a session.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthCredential {
    /// SMS verification result
    Phone {
        verification_id: String,
        verification_code: String,
    },
    /// Federated OAuth / OpenID Connect credential
    OAuth {
        provider_id: String,
        id_token: Option<String>,
        access_token: Option<String>,
        secret: Option<String>,
        raw_nonce: Option<String>,
    },
    /// Play Games server auth code
    PlayGames { server_auth_code: String },
}

impl AuthCredential {
    /// Provider identifier the credential belongs to.
    pub fn provider_id(&self) -> &str {
        match self {
            AuthCredential::Phone { .. } => "phone",
            AuthCredential::OAuth { provider_id, .. } => provider_id,
            AuthCredential::PlayGames { .. } => "playgames.google.com",
        }
    }
}

// Credentials carry bearer material; keep it out of logs.
impl fmt::Debug for AuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthCredential::Phone {
                verification_id, ..
            } => f
                .debug_struct("Phone")
                .field("verification_id", verification_id)
                .field("verification_code", &"[REDACTED]")
                .finish(),
            AuthCredential::OAuth {
                provider_id,
                id_token,
                access_token,
                secret,
                raw_nonce,
            } => f
                .debug_struct("OAuth")
                .field("provider_id", provider_id)
                .field("id_token", &id_token.as_ref().map(|_| "[REDACTED]"))
                .field("access_token", &access_token.as_ref().map(|_| "[REDACTED]"))
                .field("secret", &secret.as_ref().map(|_| "[REDACTED]"))
                .field("raw_nonce", &raw_nonce.as_ref().map(|_| "[REDACTED]"))
                .finish(),
            AuthCredential::PlayGames { .. } => f
                .debug_struct("PlayGames")
                .field("server_auth_code", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Outcome of starting phone-number verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneVerification {
    /// An SMS code was sent; the caller must come back with the code.
    CodeSent { verification_id: String },
    /// The SDK verified the number without user input (instant verification
    /// or auto-retrieval).
    AutoVerified(AuthCredential),
}

/// Callback invoked by the SDK whenever its signed-in identity changes.
pub type AuthStateCallback = Arc<dyn Fn() + Send + Sync>;

/// Token identifying one auth-state listener registered with the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(pub u64);

/// Platform-native identity SDK.
///
/// Implementations wrap the real SDK on each platform. Every async method
/// completes when the SDK's own completion callback fires; SDK rejections are
/// reported as [`BridgeError::Rejected`](crate::error::BridgeError::Rejected)
/// carrying the SDK's message verbatim.
#[async_trait]
pub trait IdentitySdk: Send + Sync {
    /// The currently signed-in user, if any.
    fn current_user(&self) -> Option<NativeUserHandle>;

    async fn sign_in_with_credential(&self, credential: AuthCredential)
        -> Result<NativeUserHandle>;

    async fn sign_in_with_custom_token(&self, token: &str) -> Result<NativeUserHandle>;

    async fn sign_in_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<NativeUserHandle>;

    async fn create_user_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<NativeUserHandle>;

    /// Start phone-number verification.
    async fn verify_phone_number(&self, phone_number: &str) -> Result<PhoneVerification>;

    async fn apply_action_code(&self, oob_code: &str) -> Result<()>;

    async fn confirm_password_reset(&self, oob_code: &str, new_password: &str) -> Result<()>;

    async fn send_password_reset_email(&self, email: &str) -> Result<()>;

    async fn sign_out(&self) -> Result<()>;

    fn set_language_code(&self, language_code: &str);

    fn use_app_language(&self);

    fn use_emulator(&self, host: &str, port: u16);

    /// Register a callback for identity changes. The SDK may invoke it once
    /// right after registration with the current state.
    fn add_auth_state_listener(&self, callback: AuthStateCallback) -> ListenerToken;

    fn remove_auth_state_listener(&self, token: ListenerToken);
}
