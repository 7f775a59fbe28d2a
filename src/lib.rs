//! Workspace façade crate.
//!
//! Re-exports the individual workspace crates so a host integration can depend
//! on `auth-bridge-workspace` alone and reach the bridge (`core_auth`), the
//! runtime utilities (`core_runtime`) and the host capability traits
//! (`bridge_traits`) from one place.

pub use bridge_traits;
pub use core_auth;
pub use core_runtime;

pub use core_auth::{AuthBridge, AuthError, CallResult};
