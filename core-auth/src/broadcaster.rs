//! # Auth State Broadcaster
//!
//! Fans the identity SDK's auth-state notifications out to registered
//! listeners and to the event bus.
//!
//! The broadcaster subscribes to the SDK once (`Uninitialized → Subscribed`)
//! and, for every notification, builds a fresh [`AuthUserSnapshot`] (or
//! `None` when signed out) and hands the same [`AuthStateChange`] to each
//! listener in registration order. Notifications are never coalesced, and
//! listeners added later only see later changes.
//!
//! The SDK may notify from its own threads, so listener bookkeeping uses
//! blocking locks that are never held while a listener runs.

use bridge_traits::{IdentitySdk, ListenerToken};
use core_runtime::events::EventBus;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use tracing::{debug, info};

use crate::snapshot::AuthUserSnapshot;
use crate::types::{AuthEvent, AuthStateChange};

/// Callback receiving every auth-state change.
pub type AuthStateListener = Arc<dyn Fn(&AuthStateChange) + Send + Sync>;

/// Handle for removing a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subscription {
    Uninitialized,
    Subscribed(ListenerToken),
}

struct ListenerRegistry {
    sdk: Arc<dyn IdentitySdk>,
    events: EventBus<AuthEvent>,
    listeners: RwLock<Vec<(ListenerId, AuthStateListener)>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    fn notify(&self) {
        let change = AuthStateChange {
            user: AuthUserSnapshot::from_current(self.sdk.as_ref()),
        };

        let listeners: Vec<AuthStateListener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        debug!(
            signed_in = change.user.is_some(),
            listeners = listeners.len(),
            "Broadcasting auth state change"
        );
        for listener in &listeners {
            listener(&change);
        }

        let _ = self.events.emit(AuthEvent::AuthStateChange(change));
    }
}

/// Single SDK subscription fanned out to any number of listeners.
pub struct AuthStateBroadcaster {
    registry: Arc<ListenerRegistry>,
    subscription: Mutex<Subscription>,
}

impl AuthStateBroadcaster {
    pub fn new(sdk: Arc<dyn IdentitySdk>, events: EventBus<AuthEvent>) -> Self {
        Self {
            registry: Arc::new(ListenerRegistry {
                sdk,
                events,
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
            subscription: Mutex::new(Subscription::Uninitialized),
        }
    }

    /// Subscribe to the SDK's notifications. Calling this again while
    /// subscribed does nothing.
    pub fn activate(&self) {
        let mut subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Subscription::Subscribed(_) = *subscription {
            debug!("Auth state broadcaster already subscribed");
            return;
        }

        // The callback must not keep the registry alive past the bridge.
        let registry: Weak<ListenerRegistry> = Arc::downgrade(&self.registry);
        let token = self
            .registry
            .sdk
            .add_auth_state_listener(Arc::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.notify();
                }
            }));

        *subscription = Subscription::Subscribed(token);
        info!(token = token.0, "Subscribed to auth state changes");
    }

    /// Drop the SDK subscription.
    pub fn deactivate(&self) {
        let mut subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Subscription::Subscribed(token) = *subscription {
            self.registry.sdk.remove_auth_state_listener(token);
            *subscription = Subscription::Uninitialized;
            info!(token = token.0, "Unsubscribed from auth state changes");
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            *self
                .subscription
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
            Subscription::Subscribed(_)
        )
    }

    /// Register `listener` for future changes.
    pub fn add_listener(&self, listener: AuthStateListener) -> ListenerId {
        let id = ListenerId(self.registry.next_id.fetch_add(1, Ordering::Relaxed));
        self.registry
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        debug!(listener = id.0, "Added auth state listener");
        id
    }

    /// Returns `false` when `id` was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .registry
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        before != listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.registry
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl fmt::Debug for AuthStateBroadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthStateBroadcaster")
            .field("active", &self.is_active())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
