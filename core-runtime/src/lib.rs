//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the authentication bridge:
//! - Logging and tracing infrastructure
//! - Bridge configuration
//! - Event bus system
//!
//! ## Overview
//!
//! This crate holds the pieces every other crate leans on but that carry no
//! authentication semantics of their own: the parsed configuration object the
//! host hands in, the `tracing` setup, and the broadcast channel used to fan
//! events out to async subscribers.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{AuthConfig, AuthConfigBuilder, EmulatorConfig};
pub use error::{Error, Result};
pub use events::{EventBus, EventStream};
