//! # Authentication Bridge
//!
//! Uniform call surface over a platform-native identity SDK.
//!
//! ## Overview
//!
//! Hosts forward named calls (`signInWithGoogle`, `getIdToken`, ...) with a
//! JSON parameter object; the bridge validates them, routes each one to the
//! identity SDK or to a provider handler, and resolves it with exactly one
//! [`CallResult`]. Redirect-style providers finish out of band: the host
//! reports the provider activity's result with its request code and the
//! [`ResultCorrelator`](correlator::ResultCorrelator) matches it to the call
//! that launched it. Auth-state changes reported by the SDK are re-broadcast
//! to every registered listener.
//!
//! ## Features
//!
//! - Parameter validation before any SDK call
//! - `skipNativeAuth` mode returning upstream credentials only
//! - Email/password, custom token, phone and eight federated providers
//! - One-shot completions with cancellation, timeout and shutdown outcomes
//! - Auth-state fan-out to listeners and the event bus

pub mod bridge;
pub mod broadcaster;
pub mod call;
pub mod correlator;
pub mod dispatcher;
pub mod error;
pub mod methods;
pub mod providers;
pub mod snapshot;
pub mod types;

pub use bridge::AuthBridge;
pub use broadcaster::{AuthStateBroadcaster, AuthStateListener, ListenerId};
pub use call::{CallFailure, CallParams, CallRequest, CallResult, Completion, PendingCall};
pub use correlator::{PendingFlowInfo, PendingOperation, ResultCorrelator};
pub use dispatcher::CallDispatcher;
pub use error::{AuthError, FailureKind, Result};
pub use methods::{AuthMethod, Operation};
pub use providers::{ProviderHandler, ProviderRegistry};
pub use snapshot::AuthUserSnapshot;
pub use types::{
    AuthEvent, AuthStateChange, CallId, CorrelationKey, CredentialSnapshot, ProviderKind,
    SignInResult,
};
