//! # Auth Bridge
//!
//! Context object owning every piece of the bridge for one host.
//!
//! ## Overview
//!
//! An [`AuthBridge`] is built once from the host-parsed configuration, the
//! native identity SDK and the activity host. It owns:
//! - the [`ProviderRegistry`] of enabled providers
//! - the [`ResultCorrelator`] table of pending redirect flows
//! - the [`CallDispatcher`] every call goes through
//! - the [`AuthStateBroadcaster`] and its listeners
//! - the [`EventBus`] of [`AuthEvent`]s
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::AuthBridge;
//! use core_runtime::config::AuthConfig;
//! use serde_json::json;
//! # use std::sync::Arc;
//! # async fn example(
//! #     sdk: Arc<dyn bridge_traits::IdentitySdk>,
//! #     host: Arc<dyn bridge_traits::ActivityHost>,
//! # ) -> core_auth::Result<()> {
//! let config = AuthConfig::from_json(&json!({ "providers": ["google.com"] }))?;
//! let bridge = AuthBridge::new(config, sdk, host)?;
//!
//! bridge.add_auth_state_listener(|change| {
//!     println!("signed in: {}", change.user.is_some());
//! });
//!
//! // Direct flows come back right away
//! let result = bridge
//!     .execute("signInWithEmailAndPassword", json!({ "email": "ada@example.com", "password": "pw" }))
//!     .await;
//!
//! // Redirect flows resolve once the host reports the activity's result
//! let pending = bridge.call("signInWithGoogle", json!({})).await;
//! // ... later, from the host's activity-result callback:
//! // bridge.handle_activity_result(request_code, result).await;
//! let result = pending.await;
//! # Ok(())
//! # }
//! ```

use bridge_traits::{ActivityHost, ActivityResult, IdentitySdk};
use core_runtime::config::AuthConfig;
use core_runtime::events::{EventBus, EventStream};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::broadcaster::{AuthStateBroadcaster, ListenerId};
use crate::call::{CallParams, CallRequest, CallResult, PendingCall};
use crate::correlator::{PendingFlowInfo, ResultCorrelator};
use crate::dispatcher::CallDispatcher;
use crate::error::Result;
use crate::providers::{ProviderContext, ProviderRegistry};
use crate::snapshot::AuthUserSnapshot;
use crate::types::{AuthEvent, AuthStateChange, ProviderKind};

/// Authentication bridge between a host's call surface and its identity SDK.
pub struct AuthBridge {
    config: AuthConfig,
    sdk: Arc<dyn IdentitySdk>,
    events: EventBus<AuthEvent>,
    registry: Arc<ProviderRegistry>,
    correlator: ResultCorrelator,
    dispatcher: CallDispatcher,
    broadcaster: AuthStateBroadcaster,
}

impl AuthBridge {
    /// Load the bridge.
    ///
    /// Validates `config`, registers the configured providers, applies the
    /// emulator and language-code overrides to the SDK and subscribes to its
    /// auth-state notifications.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or when two providers claim the same
    /// correlation code.
    pub fn new(
        config: AuthConfig,
        sdk: Arc<dyn IdentitySdk>,
        host: Arc<dyn ActivityHost>,
    ) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);
        let context = ProviderContext::new(sdk.clone(), host.clone(), config.skip_native_auth);
        let registry = Arc::new(ProviderRegistry::from_config(&config, context)?);
        let correlator = ResultCorrelator::new(
            registry.clone(),
            events.clone(),
            config.pending_flow_timeout,
        );
        let dispatcher = CallDispatcher::new(
            &config,
            sdk.clone(),
            host,
            registry.clone(),
            correlator.clone(),
            events.clone(),
        );

        if let Some(emulator) = &config.emulator {
            info!(host = %emulator.host, port = emulator.port, "Using auth emulator");
            sdk.use_emulator(&emulator.host, emulator.port);
        }
        if let Some(language_code) = &config.language_code {
            sdk.set_language_code(language_code);
        }

        let broadcaster = AuthStateBroadcaster::new(sdk.clone(), events.clone());
        broadcaster.activate();

        info!(
            providers = ?registry.providers(),
            skip_native_auth = config.skip_native_auth,
            "Auth bridge loaded"
        );

        Ok(Self {
            config,
            sdk,
            events,
            registry,
            correlator,
            dispatcher,
            broadcaster,
        })
    }

    /// Start a call and return the handle its result arrives on.
    ///
    /// Direct flows have completed by the time this returns; redirect flows
    /// have launched their activity and complete through
    /// [`handle_activity_result`](Self::handle_activity_result).
    pub async fn call(&self, method: &str, params: impl Into<CallParams>) -> PendingCall {
        let (request, pending) = CallRequest::new(method, params);
        self.dispatcher.dispatch(request).await;
        pending
    }

    /// Start a call and wait for its result.
    pub async fn execute(&self, method: &str, params: impl Into<CallParams>) -> CallResult {
        self.call(method, params).await.await
    }

    /// Deliver an activity result from the host.
    ///
    /// Returns `false` when `request_code` does not belong to a pending
    /// sign-in flow; such results are meant for someone else.
    #[instrument(skip(self, result))]
    pub async fn handle_activity_result(&self, request_code: i32, result: ActivityResult) -> bool {
        self.correlator.resolve(request_code, result).await
    }

    /// Register a listener for future auth-state changes.
    pub fn add_auth_state_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&AuthStateChange) + Send + Sync + 'static,
    {
        self.broadcaster.add_listener(Arc::new(listener))
    }

    pub fn remove_auth_state_listener(&self, id: ListenerId) -> bool {
        self.broadcaster.remove_listener(id)
    }

    /// Subscribe to the bridge's event bus.
    pub fn subscribe_events(&self) -> EventStream<AuthEvent> {
        EventStream::new(self.events.subscribe())
    }

    /// Snapshot of the SDK's current user.
    pub fn current_user(&self) -> Option<AuthUserSnapshot> {
        AuthUserSnapshot::from_current(self.sdk.as_ref())
    }

    pub async fn pending_flows(&self) -> Vec<PendingFlowInfo> {
        self.correlator.pending_flows().await
    }

    /// Providers enabled by the configuration.
    pub fn providers(&self) -> Vec<ProviderKind> {
        self.registry.providers()
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Unsubscribe from the SDK and fail every pending flow.
    pub async fn shutdown(&self) {
        self.broadcaster.deactivate();
        let drained = self.correlator.drain().await;
        debug!(drained, "Auth bridge shut down");
    }
}

impl Drop for AuthBridge {
    fn drop(&mut self) {
        self.broadcaster.deactivate();
    }
}

impl fmt::Debug for AuthBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthBridge")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("broadcaster", &self.broadcaster)
            .finish_non_exhaustive()
    }
}
