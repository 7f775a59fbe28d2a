//! # Call Dispatcher
//!
//! Routes named calls to the identity SDK or to a provider handler and fires
//! each call's completion exactly once.
//!
//! ## Dispatch order
//!
//! 1. Resolve the method name ([`AuthError::UnknownMethod`])
//! 2. Refuse methods that contradict `skipNativeAuth`
//! 3. Validate parameters ([`Operation::parse`]); nothing touches the SDK
//!    before this step succeeds
//! 4. For sign-in calls, require the provider to be registered
//! 5. Check preconditions (a signed-in user where one is needed)
//! 6. Run the operation
//!
//! Redirect flows end step 6 by registering with the
//! [`ResultCorrelator`] and launching the provider's activity; their
//! completion fires later, when the activity's result is resolved.

use bridge_traits::{ActivityHost, IdentitySdk, NativeUserHandle};
use core_runtime::config::AuthConfig;
use core_runtime::events::EventBus;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::call::{CallParams, CallRequest, Completion};
use crate::correlator::{PendingOperation, ResultCorrelator};
use crate::error::{AuthError, Result};
use crate::methods::{AuthMethod, Operation, ProviderCall};
use crate::providers::{ActivityLaunch, FlowStart, ProviderRegistry};
use crate::snapshot::AuthUserSnapshot;
use crate::types::AuthEvent;

/// Entry point for every inbound call.
pub struct CallDispatcher {
    sdk: Arc<dyn IdentitySdk>,
    host: Arc<dyn ActivityHost>,
    registry: Arc<ProviderRegistry>,
    correlator: ResultCorrelator,
    events: EventBus<AuthEvent>,
    skip_native_auth: bool,
}

impl CallDispatcher {
    pub fn new(
        config: &AuthConfig,
        sdk: Arc<dyn IdentitySdk>,
        host: Arc<dyn ActivityHost>,
        registry: Arc<ProviderRegistry>,
        correlator: ResultCorrelator,
        events: EventBus<AuthEvent>,
    ) -> Self {
        Self {
            sdk,
            host,
            registry,
            correlator,
            events,
            skip_native_auth: config.skip_native_auth,
        }
    }

    /// Run `request` up to its completion, or up to the launch of its
    /// provider activity.
    ///
    /// Failures never escape: they are delivered on the request's completion.
    #[instrument(skip(self, request), fields(method = %request.method, call_id = %request.id()))]
    pub async fn dispatch(&self, request: CallRequest) {
        let CallRequest {
            method,
            params,
            completion,
        } = request;

        match self.route(&method, &params).await {
            Ok(FlowStart::Complete(payload)) => {
                debug!("Call completed");
                completion.resolve(payload);
            }
            Ok(FlowStart::Launch(launch)) => self.launch(launch, completion).await,
            Err(error) => completion.reject(error),
        }
    }

    async fn route(&self, method: &str, params: &CallParams) -> Result<FlowStart> {
        let method =
            AuthMethod::parse(method).ok_or_else(|| AuthError::UnknownMethod(method.to_string()))?;

        if self.skip_native_auth {
            if let Some(conflict) = method.skip_native_auth_conflict() {
                return Err(conflict);
            }
        }

        let operation = Operation::parse(method, params)?;
        self.execute(operation).await
    }

    async fn execute(&self, operation: Operation) -> Result<FlowStart> {
        let payload = match operation {
            Operation::SignIn(call) => return self.begin_sign_in(call).await,
            Operation::ApplyActionCode { oob_code } => {
                self.sdk.apply_action_code(&oob_code).await?;
                None
            }
            Operation::ConfirmPasswordReset {
                oob_code,
                new_password,
            } => {
                self.sdk
                    .confirm_password_reset(&oob_code, &new_password)
                    .await?;
                None
            }
            Operation::GetCurrentUser => Some(json!({
                "user": AuthUserSnapshot::from_current(self.sdk.as_ref()),
            })),
            Operation::GetIdToken { force_refresh } => {
                let token = self.require_user()?.get_id_token(force_refresh).await?;
                Some(json!({ "token": token }))
            }
            Operation::SendEmailVerification => {
                self.require_user()?.send_email_verification().await?;
                None
            }
            Operation::SendPasswordResetEmail { email } => {
                self.sdk.send_password_reset_email(&email).await?;
                None
            }
            Operation::SetLanguageCode { language_code } => {
                self.sdk.set_language_code(&language_code);
                None
            }
            Operation::SignOut => {
                self.sign_out().await?;
                None
            }
            Operation::UpdateEmail { new_email } => {
                self.require_user()?.update_email(&new_email).await?;
                None
            }
            Operation::UpdatePassword { new_password } => {
                self.require_user()?.update_password(&new_password).await?;
                None
            }
            Operation::UseAppLanguage => {
                self.sdk.use_app_language();
                None
            }
            Operation::UseEmulator { host, port } => {
                info!(%host, port, "Using auth emulator");
                self.sdk.use_emulator(&host, port);
                None
            }
        };

        Ok(FlowStart::Complete(payload))
    }

    fn require_user(&self) -> Result<NativeUserHandle> {
        self.sdk.current_user().ok_or(AuthError::NoUserSignedIn)
    }

    async fn begin_sign_in(&self, call: ProviderCall) -> Result<FlowStart> {
        let provider = call.provider;
        let handler = self
            .registry
            .get(provider)
            .ok_or_else(|| AuthError::UnsupportedProvider(provider.as_str().to_string()))?;

        debug!(%provider, "Starting sign-in");
        let _ = self.events.emit(AuthEvent::SignInStarted { provider });
        handler.begin(&call).await
    }

    async fn launch(&self, launch: ActivityLaunch, completion: Completion) {
        let ActivityLaunch {
            key,
            request,
            state,
        } = launch;
        let provider = state.provider;

        let generation = match self
            .correlator
            .register(key, PendingOperation::new(state, completion))
            .await
        {
            Ok(generation) => generation,
            Err(operation) => {
                operation.fail(AuthError::FlowInProgress {
                    provider: provider.display_name().to_string(),
                });
                return;
            }
        };

        // Registered first: the host may report the result before `launch`
        // returns.
        match self.host.launch(request).await {
            Ok(()) => info!(%provider, code = key.code(), "Launched sign-in activity"),
            Err(error) => {
                warn!(%provider, error = %error, "Failed to launch sign-in activity");
                if let Some(operation) = self.correlator.take(key, generation).await {
                    operation.fail(error.into());
                }
            }
        }
    }

    /// Sign out of every provider SDK the host holds, then of the identity
    /// SDK. Provider sign-out failures do not block the native sign-out.
    async fn sign_out(&self) -> Result<()> {
        for handler in self.registry.handlers() {
            if let Err(error) = handler.on_sign_out().await {
                warn!(provider = %handler.kind(), error = %error, "Provider sign-out failed");
            }
        }

        self.sdk.sign_out().await?;
        info!("Signed out");
        Ok(())
    }
}

impl fmt::Debug for CallDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallDispatcher")
            .field("registry", &self.registry)
            .field("skip_native_auth", &self.skip_native_auth)
            .finish_non_exhaustive()
    }
}
