//! # Host Bridge Traits
//!
//! Capabilities the authentication core consumes but does not implement.
//!
//! ## Overview
//!
//! This crate defines the contract between the bridge core and each host
//! platform. The host owns the native identity SDK, the activity/intent
//! machinery used by redirect-style providers, and the platform logger; the
//! core reaches all three only through the traits below.
//!
//! ## Traits
//!
//! ### Identity
//! - [`IdentitySdk`](identity::IdentitySdk) - Native SDK operations and auth-state notifications
//! - [`NativeUser`](identity::NativeUser) - Opaque handle to the SDK's signed-in user
//!
//! ### Activities
//! - [`ActivityHost`](activity::ActivityHost) - Launch provider activities, sign out of provider SDKs
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). SDK rejections
//! must be reported as `BridgeError::Rejected` with the SDK's message, which
//! the core passes through to callers verbatim.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`. The SDK may call auth-state
//! callbacks from its own worker threads.

pub mod activity;
pub mod error;
pub mod identity;
pub mod time;

pub use error::BridgeError;

pub use activity::{
    ActivityData, ActivityHost, ActivityRequest, ActivityResult, RESULT_CANCELED, RESULT_OK,
};
pub use identity::{
    AuthCredential, AuthStateCallback, IdentitySdk, ListenerToken, NativeUser, NativeUserHandle,
    NativeUserInfo, PhoneVerification,
};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, SystemClock};
