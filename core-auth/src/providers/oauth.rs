//! Generic OAuth / OpenID Connect providers.
//!
//! Apple, GitHub, Microsoft, Twitter and Yahoo all sign in through the same
//! provider-hosted flow. Each flow carries a fresh [`Nonce`]: only its SHA-256
//! digest leaves the core with the launch request, and the raw value is kept
//! in the flow state until the credential comes back.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_traits::{ActivityResult, AuthCredential};
use rand::Rng;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::{debug, info, instrument};

use super::{
    activity_request, federated_options, successful_data, ActivityLaunch, FlowStart, FlowState,
    ProviderContext, ProviderHandler,
};
use crate::error::{AuthError, Result, ERROR_SIGN_IN_FAILED};
use crate::methods::ProviderCall;
use crate::types::ProviderKind;

/// Single-use nonce binding an ID token to the flow that requested it.
///
/// # Security
///
/// The raw value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Nonce {
    raw: String,
}

impl Nonce {
    /// Generate a nonce from 32 random bytes, base64url-encoded.
    pub fn new() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill(&mut bytes);
        Self {
            raw: URL_SAFE_NO_PAD.encode(bytes),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Lowercase hex SHA-256 digest of the raw value.
    pub fn hashed(&self) -> String {
        let digest = Sha256::digest(self.raw.as_bytes());
        digest.iter().map(|byte| format!("{:02x}", byte)).collect()
    }

    pub fn into_raw(self) -> String {
        self.raw
    }
}

impl Default for Nonce {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nonce").field("raw", &"[REDACTED]").finish()
    }
}

/// Handler for the providers that share the generic OAuth flow.
#[derive(Debug)]
pub struct OAuthHandler {
    kind: ProviderKind,
    context: ProviderContext,
}

impl OAuthHandler {
    pub fn new(kind: ProviderKind, context: ProviderContext) -> Self {
        Self { kind, context }
    }
}

#[async_trait]
impl ProviderHandler for OAuthHandler {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn begin(&self, call: &ProviderCall) -> Result<FlowStart> {
        let options = federated_options(self.kind, call)?;
        let key = self.kind.correlation_key().ok_or_else(|| {
            AuthError::Internal(format!("{} has no correlation code", self.kind))
        })?;

        let nonce = Nonce::new();
        debug!(provider = %self.kind, scopes = options.scopes.len(), "Preparing OAuth flow");
        Ok(FlowStart::Launch(ActivityLaunch {
            key,
            request: activity_request(key, options, Some(nonce.hashed())),
            state: FlowState::new(self.kind).with_nonce(nonce.into_raw()),
        }))
    }

    #[instrument(skip(self, state, result), fields(provider = %self.kind))]
    async fn finish(&self, state: FlowState, result: ActivityResult) -> Result<Option<Value>> {
        let data = successful_data(result)?;
        if data.id_token.is_none() && data.access_token.is_none() {
            return Err(AuthError::Provider(ERROR_SIGN_IN_FAILED.to_string()));
        }

        let value = self
            .context
            .complete_with_credential(AuthCredential::OAuth {
                provider_id: state.provider.as_str().to_string(),
                id_token: data.id_token,
                access_token: data.access_token,
                secret: data.secret,
                raw_nonce: state.raw_nonce,
            })
            .await?;
        info!("Signed in with {}", self.kind.display_name());
        Ok(Some(value))
    }
}
