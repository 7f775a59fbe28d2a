//! External Activity Abstractions
//!
//! Redirect-style providers (Google Sign-In, Play Games, Facebook Login and
//! generic OAuth providers) complete outside the core: the host launches an
//! activity/intent (or a browser redirect) and later hands the raw result back
//! together with the request code the activity was started with.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;

/// Result code reported by an activity that finished normally.
pub const RESULT_OK: i32 = -1;

/// Result code reported by an activity the user backed out of.
pub const RESULT_CANCELED: i32 = 0;

/// Description of the external activity a provider wants launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRequest {
    /// Code the host must hand back with the activity result
    pub request_code: i32,
    /// Provider identifier, e.g. `google.com`
    pub provider_id: String,
    /// Extra OAuth scopes requested by the caller
    pub scopes: Vec<String>,
    /// Provider-specific custom parameters (`prompt`, `tenant`, `login_hint`, ...)
    pub custom_parameters: BTreeMap<String, String>,
    /// SHA-256 hex digest of the raw nonce kept by the core, when the flow
    /// uses one
    pub hashed_nonce: Option<String>,
}

/// Credential material returned by an external activity.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityData {
    pub id_token: Option<String>,
    pub access_token: Option<String>,
    /// OAuth 1.0 token secret (Twitter)
    pub secret: Option<String>,
    pub server_auth_code: Option<String>,
    /// Error detail reported by the provider SDK, if the activity failed
    pub error_message: Option<String>,
}

impl fmt::Debug for ActivityData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("ActivityData")
            .field("id_token", &redact(&self.id_token))
            .field("access_token", &redact(&self.access_token))
            .field("secret", &redact(&self.secret))
            .field("server_auth_code", &redact(&self.server_auth_code))
            .field("error_message", &self.error_message)
            .finish()
    }
}

/// Raw result of an external activity as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityResult {
    pub result_code: i32,
    pub data: Option<ActivityData>,
}

impl ActivityResult {
    /// Activity finished normally with the given payload.
    pub fn ok(data: ActivityData) -> Self {
        Self {
            result_code: RESULT_OK,
            data: Some(data),
        }
    }

    /// User backed out of the activity.
    pub fn canceled() -> Self {
        Self {
            result_code: RESULT_CANCELED,
            data: None,
        }
    }

    /// Activity failed with an error reported by the provider SDK.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            result_code: RESULT_CANCELED,
            data: Some(ActivityData {
                error_message: Some(message.into()),
                ..ActivityData::default()
            }),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result_code == RESULT_OK
    }

    /// Error detail carried by the result, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|data| data.error_message.as_deref())
    }

    /// A non-OK result without any error detail means the user cancelled.
    pub fn is_user_cancellation(&self) -> bool {
        !self.is_ok() && self.error_message().is_none()
    }
}

/// Host capability for launching provider activities.
#[async_trait]
pub trait ActivityHost: Send + Sync {
    /// Launch the activity described by `request`. Returns once the activity
    /// has been started; its result arrives later through the bridge.
    async fn launch(&self, request: ActivityRequest) -> Result<()>;

    /// Sign out of the host-side provider SDK (Google Sign-In client,
    /// Facebook login manager, ...). Hosts without such state keep the
    /// default.
    async fn sign_out_provider(&self, _provider_id: &str) -> Result<()> {
        Ok(())
    }
}
