use bridge_traits::AuthCredential;
use core_runtime::events::{BusEvent, EventSeverity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::snapshot::AuthUserSnapshot;

/// Identifier attached to every inbound call for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(Uuid);

impl CallId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity providers the bridge can sign in with.
///
/// # Examples
///
/// ```
/// use core_auth::ProviderKind;
///
/// let provider = ProviderKind::parse("google.com").unwrap();
/// assert_eq!(provider, ProviderKind::Google);
/// assert_eq!(provider.display_name(), "Google");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Email and password accounts
    EmailPassword,
    /// Custom tokens minted by the app's backend
    CustomToken,
    /// SMS verification
    Phone,
    Apple,
    Facebook,
    GitHub,
    Google,
    Microsoft,
    PlayGames,
    Twitter,
    Yahoo,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 11] = [
        ProviderKind::EmailPassword,
        ProviderKind::CustomToken,
        ProviderKind::Phone,
        ProviderKind::Apple,
        ProviderKind::Facebook,
        ProviderKind::GitHub,
        ProviderKind::Google,
        ProviderKind::Microsoft,
        ProviderKind::PlayGames,
        ProviderKind::Twitter,
        ProviderKind::Yahoo,
    ];

    /// Provider identifier as used by the identity SDK and in configuration.
    ///
    /// ```
    /// use core_auth::ProviderKind;
    ///
    /// assert_eq!(ProviderKind::PlayGames.as_str(), "playgames.google.com");
    /// assert_eq!(ProviderKind::EmailPassword.as_str(), "password");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::EmailPassword => "password",
            ProviderKind::CustomToken => "custom",
            ProviderKind::Phone => "phone",
            ProviderKind::Apple => "apple.com",
            ProviderKind::Facebook => "facebook.com",
            ProviderKind::GitHub => "github.com",
            ProviderKind::Google => "google.com",
            ProviderKind::Microsoft => "microsoft.com",
            ProviderKind::PlayGames => "playgames.google.com",
            ProviderKind::Twitter => "twitter.com",
            ProviderKind::Yahoo => "yahoo.com",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::EmailPassword => "Email/Password",
            ProviderKind::CustomToken => "Custom Token",
            ProviderKind::Phone => "Phone",
            ProviderKind::Apple => "Apple",
            ProviderKind::Facebook => "Facebook",
            ProviderKind::GitHub => "GitHub",
            ProviderKind::Google => "Google",
            ProviderKind::Microsoft => "Microsoft",
            ProviderKind::PlayGames => "Play Games",
            ProviderKind::Twitter => "Twitter",
            ProviderKind::Yahoo => "Yahoo",
        }
    }

    /// Parse a provider identifier. Identifiers match exactly, the same
    /// way the configured provider list is compared.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|provider| provider.as_str() == s)
    }

    /// Whether the provider completes through an external activity.
    pub fn is_federated(&self) -> bool {
        self.correlation_key().is_some()
    }

    /// Whether the provider must appear in the configured providers list to
    /// be used. Email/password and custom tokens are always available.
    pub fn requires_opt_in(&self) -> bool {
        !matches!(self, ProviderKind::EmailPassword | ProviderKind::CustomToken)
    }

    /// Correlation key reserved for this provider's activity results.
    pub fn correlation_key(&self) -> Option<CorrelationKey> {
        match self {
            ProviderKind::Apple => Some(CorrelationKey::Apple),
            ProviderKind::Facebook => Some(CorrelationKey::Facebook),
            ProviderKind::GitHub => Some(CorrelationKey::GitHub),
            ProviderKind::Google => Some(CorrelationKey::Google),
            ProviderKind::Microsoft => Some(CorrelationKey::Microsoft),
            ProviderKind::PlayGames => Some(CorrelationKey::PlayGames),
            ProviderKind::Twitter => Some(CorrelationKey::Twitter),
            ProviderKind::Yahoo => Some(CorrelationKey::Yahoo),
            ProviderKind::EmailPassword | ProviderKind::CustomToken | ProviderKind::Phone => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed correlation key for redirect/activity flows.
///
/// The integer request code only exists at the host boundary; everything
/// inside the bridge works with the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CorrelationKey {
    Google,
    Apple,
    GitHub,
    PlayGames,
    Microsoft,
    Twitter,
    Yahoo,
    Facebook,
}

impl CorrelationKey {
    pub const ALL: [CorrelationKey; 8] = [
        CorrelationKey::Google,
        CorrelationKey::Apple,
        CorrelationKey::GitHub,
        CorrelationKey::PlayGames,
        CorrelationKey::Microsoft,
        CorrelationKey::Twitter,
        CorrelationKey::Yahoo,
        CorrelationKey::Facebook,
    ];

    /// Request code the host starts the activity with.
    pub const fn code(&self) -> i32 {
        match self {
            CorrelationKey::Google => 9001,
            CorrelationKey::Apple => 9002,
            CorrelationKey::GitHub => 9003,
            CorrelationKey::PlayGames => 9004,
            CorrelationKey::Microsoft => 9005,
            CorrelationKey::Twitter => 9006,
            CorrelationKey::Yahoo => 9007,
            // Facebook's login manager always reports on its own request code
            CorrelationKey::Facebook => 64206,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.code() == code)
    }

    pub fn provider(&self) -> ProviderKind {
        match self {
            CorrelationKey::Google => ProviderKind::Google,
            CorrelationKey::Apple => ProviderKind::Apple,
            CorrelationKey::GitHub => ProviderKind::GitHub,
            CorrelationKey::PlayGames => ProviderKind::PlayGames,
            CorrelationKey::Microsoft => ProviderKind::Microsoft,
            CorrelationKey::Twitter => ProviderKind::Twitter,
            CorrelationKey::Yahoo => ProviderKind::Yahoo,
            CorrelationKey::Facebook => ProviderKind::Facebook,
        }
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.provider(), self.code())
    }
}

/// Upstream credential returned alongside a sign-in.
///
/// # Security
///
/// The `Debug` implementation redacts token material.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSnapshot {
    pub provider_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// OAuth 1.0 token secret (Twitter)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Raw nonce whose digest was sent to the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_auth_code: Option<String>,
}

impl CredentialSnapshot {
    /// Copy the caller-visible parts of a credential. Phone credentials only
    /// expose their provider id.
    pub fn from_credential(credential: &AuthCredential) -> Self {
        match credential {
            AuthCredential::Phone { .. } => Self {
                provider_id: credential.provider_id().to_string(),
                ..Self::default()
            },
            AuthCredential::OAuth {
                provider_id,
                id_token,
                access_token,
                secret,
                raw_nonce,
            } => Self {
                provider_id: provider_id.clone(),
                id_token: id_token.clone(),
                access_token: access_token.clone(),
                secret: secret.clone(),
                nonce: raw_nonce.clone(),
                server_auth_code: None,
            },
            AuthCredential::PlayGames { server_auth_code } => Self {
                provider_id: credential.provider_id().to_string(),
                server_auth_code: Some(server_auth_code.clone()),
                ..Self::default()
            },
        }
    }
}

impl fmt::Debug for CredentialSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("CredentialSnapshot")
            .field("provider_id", &self.provider_id)
            .field("id_token", &redact(&self.id_token))
            .field("access_token", &redact(&self.access_token))
            .field("secret", &redact(&self.secret))
            .field("nonce", &redact(&self.nonce))
            .field("server_auth_code", &redact(&self.server_auth_code))
            .finish()
    }
}

/// Payload of every successful sign-in call.
///
/// `user` is `None` when `skipNativeAuth` is on; `credential` is `None` for
/// flows without upstream credential material (email/password, custom token).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResult {
    pub user: Option<AuthUserSnapshot>,
    pub credential: Option<CredentialSnapshot>,
}

impl SignInResult {
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "user": self.user,
            "credential": self.credential,
        })
    }
}

/// Payload of the `authStateChange` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthStateChange {
    pub user: Option<AuthUserSnapshot>,
}

/// Events published on the bridge's event bus.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// The SDK reported an identity change
    AuthStateChange(AuthStateChange),
    /// A sign-in flow was started
    SignInStarted { provider: ProviderKind },
    /// A pending redirect flow never reported back and was failed
    PendingFlowExpired { key: CorrelationKey },
}

impl AuthEvent {
    /// Wire name of the event, for hosts that forward it.
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::AuthStateChange(_) => "authStateChange",
            AuthEvent::SignInStarted { .. } => "signInStarted",
            AuthEvent::PendingFlowExpired { .. } => "pendingFlowExpired",
        }
    }
}

impl BusEvent for AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::AuthStateChange(change) if change.user.is_some() => "User signed in",
            AuthEvent::AuthStateChange(_) => "User signed out",
            AuthEvent::SignInStarted { .. } => "Sign-in started",
            AuthEvent::PendingFlowExpired { .. } => "Pending sign-in flow expired",
        }
    }

    fn severity(&self) -> EventSeverity {
        match self {
            AuthEvent::PendingFlowExpired { .. } => EventSeverity::Warning,
            AuthEvent::AuthStateChange(_) => EventSeverity::Info,
            AuthEvent::SignInStarted { .. } => EventSeverity::Debug,
        }
    }
}
