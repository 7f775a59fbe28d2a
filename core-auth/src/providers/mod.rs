//! # Provider Handlers
//!
//! One handler per identity provider behind a common capability trait.
//!
//! ## Overview
//!
//! Handlers come in two families:
//! - **Direct-credential** (email/password, custom token, phone): `begin`
//!   talks to the identity SDK and completes the call right away.
//! - **Redirect/activity** (Google, Play Games, Facebook, generic OAuth):
//!   `begin` describes an external activity to launch plus the context needed
//!   to finish it; the dispatcher registers that context with the
//!   [`ResultCorrelator`](crate::correlator::ResultCorrelator) and `finish`
//!   runs once the host reports the activity's result.
//!
//! The [`ProviderRegistry`] holds the handlers enabled by configuration and
//! guarantees that no two of them share a correlation code.

mod custom_token;
mod email_password;
mod facebook;
mod google;
mod oauth;
mod phone;
mod play_games;

pub use custom_token::CustomTokenHandler;
pub use email_password::EmailPasswordHandler;
pub use facebook::FacebookHandler;
pub use google::GoogleHandler;
pub use oauth::{Nonce, OAuthHandler};
pub use phone::PhoneHandler;
pub use play_games::PlayGamesHandler;

use async_trait::async_trait;
use bridge_traits::{
    ActivityData, ActivityHost, ActivityRequest, ActivityResult, AuthCredential, IdentitySdk,
    NativeUserHandle,
};
use core_runtime::config::AuthConfig;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{AuthError, Result, ERROR_SIGN_IN_FAILED};
use crate::methods::{FederatedOptions, ProviderCall, SignInInput};
use crate::snapshot::AuthUserSnapshot;
use crate::types::{CorrelationKey, CredentialSnapshot, ProviderKind, SignInResult};

/// Capabilities shared by every handler.
#[derive(Clone)]
pub struct ProviderContext {
    pub sdk: Arc<dyn IdentitySdk>,
    pub host: Arc<dyn ActivityHost>,
    /// Return upstream credentials only, without creating an SDK session
    pub skip_native_auth: bool,
}

impl ProviderContext {
    pub fn new(
        sdk: Arc<dyn IdentitySdk>,
        host: Arc<dyn ActivityHost>,
        skip_native_auth: bool,
    ) -> Self {
        Self {
            sdk,
            host,
            skip_native_auth,
        }
    }

    /// Sign-in payload for flows that produce a user but no credential.
    pub fn user_result(&self, user: &NativeUserHandle) -> Value {
        SignInResult {
            user: Some(AuthUserSnapshot::from_native(user.as_ref())),
            credential: None,
        }
        .to_value()
    }

    /// Exchange an upstream credential for an SDK session, unless
    /// `skipNativeAuth` is on, in which case only the credential comes back.
    pub async fn complete_with_credential(&self, credential: AuthCredential) -> Result<Value> {
        let snapshot = CredentialSnapshot::from_credential(&credential);

        if self.skip_native_auth {
            debug!(provider = %snapshot.provider_id, "Skipping native sign-in");
            return Ok(SignInResult {
                user: None,
                credential: Some(snapshot),
            }
            .to_value());
        }

        let user = self.sdk.sign_in_with_credential(credential).await?;
        Ok(SignInResult {
            user: Some(AuthUserSnapshot::from_native(user.as_ref())),
            credential: Some(snapshot),
        }
        .to_value())
    }
}

impl fmt::Debug for ProviderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderContext")
            .field("skip_native_auth", &self.skip_native_auth)
            .finish_non_exhaustive()
    }
}

/// Provider-specific context kept while an external activity runs.
#[derive(Clone, PartialEq, Eq)]
pub struct FlowState {
    pub provider: ProviderKind,
    /// Raw nonce whose digest went out with the launch request
    pub raw_nonce: Option<String>,
}

impl FlowState {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            raw_nonce: None,
        }
    }

    pub fn with_nonce(mut self, raw_nonce: impl Into<String>) -> Self {
        self.raw_nonce = Some(raw_nonce.into());
        self
    }
}

impl fmt::Debug for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowState")
            .field("provider", &self.provider)
            .field("raw_nonce", &self.raw_nonce.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// External activity a redirect handler wants launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityLaunch {
    pub key: CorrelationKey,
    pub request: ActivityRequest,
    pub state: FlowState,
}

/// How a handler's `begin` step ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowStart {
    /// The call is done; resolve it with this payload
    Complete(Option<Value>),
    /// The call waits for an external activity
    Launch(ActivityLaunch),
}

/// Capability implemented by every provider.
#[async_trait]
pub trait ProviderHandler: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Start the provider's flow for `call`.
    async fn begin(&self, call: &ProviderCall) -> Result<FlowStart>;

    /// Turn an external activity's result into the call's payload.
    ///
    /// User cancellations never reach this method.
    async fn finish(&self, _state: FlowState, _result: ActivityResult) -> Result<Option<Value>> {
        Err(AuthError::Internal(format!(
            "{} does not complete through an activity.",
            self.kind()
        )))
    }

    /// Sign out of any host-side provider SDK state.
    async fn on_sign_out(&self) -> Result<()> {
        Ok(())
    }
}

/// Handlers enabled for this bridge, keyed by provider.
#[derive(Default)]
pub struct ProviderRegistry {
    handlers: BTreeMap<ProviderKind, Arc<dyn ProviderHandler>>,
    codes: HashMap<i32, ProviderKind>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry the configuration asks for.
    ///
    /// Email/password and custom-token sign-in are always registered; phone
    /// and federated providers only when listed in `config.providers`.
    /// Unknown identifiers are skipped with a warning.
    pub fn from_config(config: &AuthConfig, context: ProviderContext) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(EmailPasswordHandler::new(context.clone())))?;
        registry.register(Arc::new(CustomTokenHandler::new(context.clone())))?;

        for provider_id in &config.providers {
            let Some(kind) = ProviderKind::parse(provider_id) else {
                warn!(provider = %provider_id, "Ignoring unknown provider in configuration");
                continue;
            };

            let handler: Arc<dyn ProviderHandler> = match kind {
                ProviderKind::EmailPassword | ProviderKind::CustomToken => continue,
                ProviderKind::Phone => Arc::new(PhoneHandler::new(context.clone())),
                ProviderKind::Google => Arc::new(GoogleHandler::new(context.clone())),
                ProviderKind::PlayGames => Arc::new(PlayGamesHandler::new(context.clone())),
                ProviderKind::Facebook => Arc::new(FacebookHandler::new(context.clone())),
                ProviderKind::Apple
                | ProviderKind::GitHub
                | ProviderKind::Microsoft
                | ProviderKind::Twitter
                | ProviderKind::Yahoo => Arc::new(OAuthHandler::new(kind, context.clone())),
            };
            registry.register(handler)?;
        }

        debug!(providers = ?registry.providers(), "Provider registry ready");
        Ok(registry)
    }

    /// Add a handler.
    ///
    /// # Errors
    ///
    /// Fails when the provider already has a handler or its correlation code
    /// is taken by another provider.
    pub fn register(&mut self, handler: Arc<dyn ProviderHandler>) -> Result<()> {
        let kind = handler.kind();
        if self.handlers.contains_key(&kind) {
            return Err(config_error(format!(
                "Provider {} is registered more than once",
                kind
            )));
        }

        if let Some(key) = kind.correlation_key() {
            if let Some(owner) = self.codes.get(&key.code()) {
                return Err(config_error(format!(
                    "Request code {} of {} is already used by {}",
                    key.code(),
                    kind,
                    owner
                )));
            }
            self.codes.insert(key.code(), kind);
        }

        self.handlers.insert(kind, handler);
        Ok(())
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn ProviderHandler>> {
        self.handlers.get(&kind).cloned()
    }

    pub fn contains(&self, kind: ProviderKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn providers(&self) -> Vec<ProviderKind> {
        self.handlers.keys().copied().collect()
    }

    pub fn handlers(&self) -> impl Iterator<Item = &Arc<dyn ProviderHandler>> {
        self.handlers.values()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}

fn config_error(message: String) -> AuthError {
    AuthError::Config(core_runtime::Error::Config(message))
}

/// Handlers only receive calls for their own provider; anything else is a
/// routing bug.
pub(crate) fn unexpected_input(kind: ProviderKind, call: &ProviderCall) -> AuthError {
    AuthError::Internal(format!(
        "{} handler received a {} call",
        kind, call.method
    ))
}

pub(crate) fn federated_options(kind: ProviderKind, call: &ProviderCall) -> Result<&FederatedOptions> {
    match &call.input {
        SignInInput::Federated(options) => Ok(options),
        _ => Err(unexpected_input(kind, call)),
    }
}

pub(crate) fn activity_request(
    key: CorrelationKey,
    options: &FederatedOptions,
    hashed_nonce: Option<String>,
) -> ActivityRequest {
    ActivityRequest {
        request_code: key.code(),
        provider_id: key.provider().as_str().to_string(),
        scopes: options.scopes.clone(),
        custom_parameters: options.custom_parameters.clone(),
        hashed_nonce,
    }
}

/// Payload of a finished activity, or the provider's error.
pub(crate) fn successful_data(result: ActivityResult) -> Result<ActivityData> {
    if let Some(message) = result.error_message() {
        return Err(AuthError::Provider(message.to_string()));
    }
    if !result.is_ok() {
        return Err(AuthError::Provider(ERROR_SIGN_IN_FAILED.to_string()));
    }
    result
        .data
        .ok_or_else(|| AuthError::Provider(ERROR_SIGN_IN_FAILED.to_string()))
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use bridge_traits::RESULT_CANCELED;

    struct FixedHandler(ProviderKind);

    #[async_trait]
    impl ProviderHandler for FixedHandler {
        fn kind(&self) -> ProviderKind {
            self.0
        }

        async fn begin(&self, _call: &ProviderCall) -> Result<FlowStart> {
            Ok(FlowStart::Complete(None))
        }
    }

    #[test]
    fn test_from_config_registers_listed_providers() {
        let config = AuthConfig::builder()
            .providers(["google.com", "phone", "apple.com", "unknown.example"])
            .build()
            .unwrap();
        let registry =
            ProviderRegistry::from_config(&config, context(MockSdk::new(), MockHost::new(), false))
                .unwrap();

        assert!(registry.contains(ProviderKind::Google));
        assert!(registry.contains(ProviderKind::Phone));
        assert!(registry.contains(ProviderKind::Apple));
        assert!(registry.contains(ProviderKind::EmailPassword));
        assert!(registry.contains(ProviderKind::CustomToken));
        assert!(!registry.contains(ProviderKind::Facebook));
        assert!(!registry.contains(ProviderKind::Yahoo));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(Arc::new(FixedHandler(ProviderKind::Google)))
            .unwrap();
        let error = registry
            .register(Arc::new(FixedHandler(ProviderKind::Google)))
            .unwrap_err();
        assert!(matches!(error, AuthError::Config(_)));
    }

    #[test]
    fn test_case_variants_are_unknown_providers() {
        let config = AuthConfig::builder()
            .providers(["google.com", "Google.com", "GITHUB.COM"])
            .build()
            .unwrap();
        let registry =
            ProviderRegistry::from_config(&config, context(MockSdk::new(), MockHost::new(), false))
                .unwrap();

        assert!(registry.contains(ProviderKind::Google));
        assert!(!registry.contains(ProviderKind::GitHub));
        assert!(config.is_provider_enabled("google.com"));
        assert!(!config.is_provider_enabled("github.com"));
    }

    #[test]
    fn test_successful_data_classification() {
        let failed = successful_data(ActivityResult::failed("12500: developer error")).unwrap_err();
        assert_eq!(failed.to_string(), "12500: developer error");

        let empty = successful_data(ActivityResult {
            result_code: bridge_traits::RESULT_OK,
            data: None,
        })
        .unwrap_err();
        assert_eq!(empty.to_string(), ERROR_SIGN_IN_FAILED);

        let odd = successful_data(ActivityResult {
            result_code: RESULT_CANCELED,
            data: Some(ActivityData::default()),
        })
        .unwrap_err();
        assert_eq!(odd.to_string(), ERROR_SIGN_IN_FAILED);
    }

    #[tokio::test]
    async fn test_skip_native_auth_returns_credential_only() {
        // No expectations: any SDK call would panic.
        let ctx = context(MockSdk::new(), MockHost::new(), true);
        let value = ctx
            .complete_with_credential(AuthCredential::PlayGames {
                server_auth_code: "4/0Ab".to_string(),
            })
            .await
            .unwrap();

        assert!(value["user"].is_null());
        assert_eq!(value["credential"]["providerId"], "playgames.google.com");
        assert_eq!(value["credential"]["serverAuthCode"], "4/0Ab");
    }

    #[tokio::test]
    async fn test_native_sign_in_with_credential() {
        let mut sdk = MockSdk::new();
        sdk.expect_sign_in_with_credential()
            .times(1)
            .returning(|_| Ok(TestUser::handle("uid-1", Some("ada@example.com"))));

        let ctx = context(sdk, MockHost::new(), false);
        let value = ctx
            .complete_with_credential(AuthCredential::OAuth {
                provider_id: "google.com".to_string(),
                id_token: Some("id".to_string()),
                access_token: None,
                secret: None,
                raw_nonce: None,
            })
            .await
            .unwrap();

        assert_eq!(value["user"]["uid"], "uid-1");
        assert_eq!(value["credential"]["idToken"], "id");
    }
}
