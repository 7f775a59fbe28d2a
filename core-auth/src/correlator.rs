//! # Result Correlator
//!
//! Matches the results of external activities with the calls that launched
//! them.
//!
//! ## Overview
//!
//! A redirect-style sign-in leaves the bridge when the host launches the
//! provider's activity and comes back later as a bare `(request code, result)`
//! pair. The correlator keeps one [`PendingOperation`] per [`CorrelationKey`]
//! and, when a result arrives:
//!
//! 1. Removes the operation registered under the code (one-shot)
//! 2. Turns a user cancellation into [`AuthError::Cancelled`]
//! 3. Otherwise hands the raw result to the provider's `finish` step
//! 4. Fires the original call's completion with the outcome
//!
//! Codes with nothing registered belong to other components of the host and
//! are ignored.
//!
//! ## Expiry
//!
//! Activities can be killed without ever reporting back. Each registration
//! arms a timer (`pending_flow_timeout`); when it fires first, the operation
//! is removed and its call fails with [`AuthError::Timeout`]. Timers are
//! tagged with the registration's generation, so a timer left over from an
//! earlier flow on the same key never touches a newer one.

use bridge_traits::{ActivityResult, Clock, SystemClock};
use chrono::{DateTime, Utc};
use core_runtime::events::EventBus;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::call::Completion;
use crate::error::AuthError;
use crate::providers::{FlowState, ProviderRegistry};
use crate::types::{AuthEvent, CorrelationKey, ProviderKind};

/// A call waiting for an external activity's result.
#[derive(Debug)]
pub struct PendingOperation {
    /// Provider context needed to finish the flow
    pub state: FlowState,
    pub completion: Completion,
}

impl PendingOperation {
    pub fn new(state: FlowState, completion: Completion) -> Self {
        Self { state, completion }
    }

    pub fn provider(&self) -> ProviderKind {
        self.state.provider
    }

    /// Fail the waiting call.
    pub fn fail(self, error: AuthError) {
        self.completion.reject(error);
    }
}

/// Read-only view of a registered flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFlowInfo {
    pub key: CorrelationKey,
    pub provider: ProviderKind,
    pub registered_at: DateTime<Utc>,
}

struct PendingEntry {
    generation: u64,
    registered_at: DateTime<Utc>,
    operation: PendingOperation,
    expiry: Option<JoinHandle<()>>,
}

impl PendingEntry {
    fn into_operation(self) -> PendingOperation {
        if let Some(expiry) = self.expiry {
            expiry.abort();
        }
        self.operation
    }
}

struct CorrelatorInner {
    pending: Mutex<HashMap<CorrelationKey, PendingEntry>>,
    registry: Arc<ProviderRegistry>,
    events: EventBus<AuthEvent>,
    clock: Arc<dyn Clock>,
    timeout: Option<Duration>,
    next_generation: AtomicU64,
}

/// Table of pending redirect flows keyed by correlation key.
///
/// Cloning is cheap; clones share the same table.
#[derive(Clone)]
pub struct ResultCorrelator {
    inner: Arc<CorrelatorInner>,
}

impl ResultCorrelator {
    /// Create a correlator that finishes flows through `registry`'s handlers.
    ///
    /// `timeout` bounds how long a flow may stay pending; `None` keeps flows
    /// until a result arrives or the bridge shuts down.
    pub fn new(
        registry: Arc<ProviderRegistry>,
        events: EventBus<AuthEvent>,
        timeout: Option<Duration>,
    ) -> Self {
        Self::with_clock(registry, events, timeout, Arc::new(SystemClock))
    }

    pub fn with_clock(
        registry: Arc<ProviderRegistry>,
        events: EventBus<AuthEvent>,
        timeout: Option<Duration>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(CorrelatorInner {
                pending: Mutex::new(HashMap::new()),
                registry,
                events,
                clock,
                timeout,
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    /// Register `operation` under `key`.
    ///
    /// Returns the registration's generation, which [`take`](Self::take)
    /// needs to withdraw exactly this registration.
    ///
    /// # Errors
    ///
    /// Hands `operation` back untouched when a flow is already pending under
    /// `key`; the pending flow is left as it is.
    pub async fn register(
        &self,
        key: CorrelationKey,
        operation: PendingOperation,
    ) -> std::result::Result<u64, PendingOperation> {
        let mut pending = self.inner.pending.lock().await;
        if pending.contains_key(&key) {
            warn!(%key, "Sign-in flow already pending for this request code");
            return Err(operation);
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let expiry = self.inner.timeout.and_then(|timeout| {
            // Hosts may poll the bridge from their own executor; without a
            // runtime there is nothing to drive the timer.
            let Ok(handle) = Handle::try_current() else {
                warn!(%key, "No tokio runtime available; pending flow will not expire");
                return None;
            };
            Some(spawn_expiry(
                &handle,
                Arc::downgrade(&self.inner),
                key,
                generation,
                timeout,
            ))
        });

        pending.insert(
            key,
            PendingEntry {
                generation,
                registered_at: self.inner.clock.now(),
                operation,
                expiry,
            },
        );
        debug!(%key, code = key.code(), generation, "Registered pending flow");
        Ok(generation)
    }

    /// Deliver an activity result reported under `code`.
    ///
    /// Returns `true` when the code belonged to a pending flow, which is then
    /// completed; unknown or already-consumed codes return `false`.
    #[instrument(skip(self, result), fields(result_code = result.result_code))]
    pub async fn resolve(&self, code: i32, result: ActivityResult) -> bool {
        let Some(key) = CorrelationKey::from_code(code) else {
            debug!("Ignoring activity result for a foreign request code");
            return false;
        };

        let entry = self.inner.pending.lock().await.remove(&key);
        let Some(entry) = entry else {
            debug!(%key, "No pending flow for this request code");
            return false;
        };
        let operation = entry.into_operation();
        let provider = operation.provider();

        if result.is_user_cancellation() {
            info!(%provider, "Sign-in cancelled by the user");
            operation.fail(AuthError::Cancelled {
                provider: provider.display_name().to_string(),
            });
            return true;
        }

        let PendingOperation { state, completion } = operation;
        let outcome = match self.inner.registry.get(provider) {
            Some(handler) => handler.finish(state, result).await,
            None => Err(AuthError::Internal(format!(
                "no handler registered for {}",
                provider
            ))),
        };
        if let Err(error) = &outcome {
            debug!(%provider, error = %error, "Sign-in flow failed");
        }
        completion.complete(outcome);
        true
    }

    /// Withdraw the registration made under `key` with `generation`.
    ///
    /// Used when launching the activity failed after registration. A newer
    /// registration on the same key is left alone.
    pub async fn take(&self, key: CorrelationKey, generation: u64) -> Option<PendingOperation> {
        let mut pending = self.inner.pending.lock().await;
        if !is_generation(&pending, key, generation) {
            return None;
        }
        pending.remove(&key).map(PendingEntry::into_operation)
    }

    pub async fn is_pending(&self, key: CorrelationKey) -> bool {
        self.inner.pending.lock().await.contains_key(&key)
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.pending.lock().await.len()
    }

    /// Flows currently waiting for a result, oldest first.
    pub async fn pending_flows(&self) -> Vec<PendingFlowInfo> {
        let pending = self.inner.pending.lock().await;
        let mut flows: Vec<_> = pending
            .iter()
            .map(|(key, entry)| PendingFlowInfo {
                key: *key,
                provider: entry.operation.provider(),
                registered_at: entry.registered_at,
            })
            .collect();
        flows.sort_by_key(|flow| flow.registered_at);
        flows
    }

    /// Fail every pending flow. Returns how many were failed.
    pub async fn drain(&self) -> usize {
        let entries: Vec<_> = self.inner.pending.lock().await.drain().collect();
        let count = entries.len();
        for (key, entry) in entries {
            let operation = entry.into_operation();
            debug!(%key, "Failing pending flow on shutdown");
            let provider = operation.provider();
            operation.fail(AuthError::Internal(format!(
                "sign-in with {} was abandoned because the bridge shut down.",
                provider.display_name()
            )));
        }
        if count > 0 {
            info!(count, "Drained pending sign-in flows");
        }
        count
    }
}

impl fmt::Debug for ResultCorrelator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCorrelator")
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

fn is_generation(
    pending: &HashMap<CorrelationKey, PendingEntry>,
    key: CorrelationKey,
    generation: u64,
) -> bool {
    pending
        .get(&key)
        .is_some_and(|entry| entry.generation == generation)
}

fn spawn_expiry(
    handle: &Handle,
    inner: Weak<CorrelatorInner>,
    key: CorrelationKey,
    generation: u64,
    timeout: Duration,
) -> JoinHandle<()> {
    handle.spawn(async move {
        tokio::time::sleep(timeout).await;

        let Some(inner) = inner.upgrade() else {
            return;
        };
        let entry = {
            let mut pending = inner.pending.lock().await;
            if !is_generation(&pending, key, generation) {
                return;
            }
            pending.remove(&key)
        };
        let Some(entry) = entry else {
            return;
        };

        // Dropping the handle detaches this task; aborting it would cancel
        // the failure below.
        let PendingEntry { operation, .. } = entry;
        let provider = operation.provider();
        warn!(%key, %provider, timeout_secs = timeout.as_secs(), "Pending sign-in flow expired");
        operation.fail(AuthError::Timeout {
            provider: provider.display_name().to_string(),
            seconds: timeout.as_secs(),
        });
        let _ = inner.events.emit(AuthEvent::PendingFlowExpired { key });
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::{CallParams, CallRequest, CallResult, PendingCall};
    use crate::error::{FailureKind, Result};
    use crate::methods::ProviderCall;
    use crate::providers::{FlowStart, ProviderHandler};
    use async_trait::async_trait;
    use bridge_traits::ActivityData;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    struct EchoHandler;

    #[async_trait]
    impl ProviderHandler for EchoHandler {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Google
        }

        async fn begin(&self, _call: &ProviderCall) -> Result<FlowStart> {
            Ok(FlowStart::Complete(None))
        }

        async fn finish(&self, _state: FlowState, result: ActivityResult) -> Result<Option<Value>> {
            match result.error_message() {
                Some(message) => Err(AuthError::Provider(message.to_string())),
                None => Ok(Some(json!({ "finished": true }))),
            }
        }
    }

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        }
    }

    fn correlator(timeout: Option<Duration>) -> (ResultCorrelator, EventBus<AuthEvent>) {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(EchoHandler)).unwrap();
        let events = EventBus::new(16);
        let correlator = ResultCorrelator::with_clock(
            Arc::new(registry),
            events.clone(),
            timeout,
            Arc::new(FixedClock),
        );
        (correlator, events)
    }

    fn operation() -> (PendingOperation, PendingCall) {
        let (request, pending) = CallRequest::new("signInWithGoogle", CallParams::new());
        (
            PendingOperation::new(FlowState::new(ProviderKind::Google), request.completion),
            pending,
        )
    }

    #[tokio::test]
    async fn test_success_resolves_call_once() {
        let (correlator, _) = correlator(None);
        let (op, pending) = operation();
        correlator.register(CorrelationKey::Google, op).await.unwrap();

        let code = CorrelationKey::Google.code();
        assert!(correlator.resolve(code, ActivityResult::ok(ActivityData::default())).await);
        assert_eq!(pending.await, CallResult::Success(Some(json!({ "finished": true }))));

        // Second delivery for the same code is ignored
        assert!(!correlator.resolve(code, ActivityResult::ok(ActivityData::default())).await);
        assert_eq!(correlator.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_cancellation_is_distinct_failure() {
        let (correlator, _) = correlator(None);
        let (op, pending) = operation();
        correlator.register(CorrelationKey::Google, op).await.unwrap();

        assert!(correlator.resolve(9001, ActivityResult::canceled()).await);
        let failure = pending.await.into_result().unwrap_err();
        assert!(failure.is_cancelled());
        assert_eq!(failure.message, "sign-in with Google was cancelled.");
    }

    #[tokio::test]
    async fn test_provider_error_passes_through() {
        let (correlator, _) = correlator(None);
        let (op, pending) = operation();
        correlator.register(CorrelationKey::Google, op).await.unwrap();

        correlator
            .resolve(9001, ActivityResult::failed("12500: developer error"))
            .await;
        let failure = pending.await.into_result().unwrap_err();
        assert_eq!(failure.kind, FailureKind::Provider);
        assert_eq!(failure.message, "12500: developer error");
    }

    #[tokio::test]
    async fn test_unknown_codes_are_ignored() {
        let (correlator, _) = correlator(None);
        assert!(!correlator.resolve(4242, ActivityResult::canceled()).await);
        // Known code, nothing registered
        assert!(!correlator.resolve(9002, ActivityResult::canceled()).await);
    }

    #[tokio::test]
    async fn test_duplicate_registration_returns_operation() {
        let (correlator, _) = correlator(None);
        let (first, first_pending) = operation();
        correlator.register(CorrelationKey::Google, first).await.unwrap();

        let (second, second_pending) = operation();
        let rejected = correlator
            .register(CorrelationKey::Google, second)
            .await
            .unwrap_err();
        rejected.fail(AuthError::FlowInProgress {
            provider: "Google".to_string(),
        });
        assert_eq!(
            second_pending.await.failure().unwrap().kind,
            FailureKind::Precondition
        );

        // The first flow is still there and still completes
        assert!(correlator.resolve(9001, ActivityResult::ok(ActivityData::default())).await);
        assert!(first_pending.await.is_success());
    }

    #[tokio::test]
    async fn test_take_respects_generation() {
        let (correlator, _) = correlator(None);
        let (op, _pending) = operation();
        let generation = correlator.register(CorrelationKey::Google, op).await.unwrap();

        assert!(correlator
            .take(CorrelationKey::Google, generation + 1)
            .await
            .is_none());
        assert!(correlator.is_pending(CorrelationKey::Google).await);
        assert!(correlator
            .take(CorrelationKey::Google, generation)
            .await
            .is_some());
        assert!(!correlator.is_pending(CorrelationKey::Google).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_flow_fails_with_timeout() {
        let (correlator, events) = correlator(Some(Duration::from_secs(300)));
        let mut receiver = events.subscribe();
        let (op, pending) = operation();
        correlator.register(CorrelationKey::Google, op).await.unwrap();

        tokio::time::sleep(Duration::from_secs(301)).await;

        let failure = pending.await.into_result().unwrap_err();
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(failure.message, "sign-in with Google timed out after 300s.");
        assert_eq!(
            receiver.recv().await.unwrap(),
            AuthEvent::PendingFlowExpired {
                key: CorrelationKey::Google
            }
        );

        // A late result is just another unknown code
        assert!(!correlator.resolve(9001, ActivityResult::canceled()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolved_flow_never_expires() {
        let (correlator, events) = correlator(Some(Duration::from_secs(60)));
        let mut receiver = events.subscribe();
        let (op, pending) = operation();
        correlator.register(CorrelationKey::Google, op).await.unwrap();
        correlator.resolve(9001, ActivityResult::ok(ActivityData::default())).await;
        assert!(pending.await.is_success());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_pending_flows_and_drain() {
        let (correlator, _) = correlator(None);
        let (op, pending) = operation();
        correlator.register(CorrelationKey::Google, op).await.unwrap();

        let flows = correlator.pending_flows().await;
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].provider, ProviderKind::Google);
        assert_eq!(flows[0].registered_at, FixedClock.now());

        assert_eq!(correlator.drain().await, 1);
        assert_eq!(pending.await.failure().unwrap().kind, FailureKind::Internal);
        assert_eq!(correlator.pending_count().await, 0);
    }
}
