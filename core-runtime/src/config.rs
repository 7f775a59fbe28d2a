//! # Bridge Configuration
//!
//! Provides the configuration object consumed by the authentication bridge.
//!
//! ## Overview
//!
//! The host loads its static plugin configuration (provider list, feature
//! flags) and hands the parsed result to the core, either as a JSON object or
//! through the [`AuthConfigBuilder`]. Both paths end in the same fail-fast
//! validation so a misconfigured bridge refuses to start instead of failing
//! on the first call.
//!
//! ## Usage
//!
//! ### Builder
//!
//! ```
//! use core_runtime::config::AuthConfig;
//!
//! let config = AuthConfig::builder()
//!     .skip_native_auth(false)
//!     .providers(["google.com", "phone"])
//!     .emulator("10.0.2.2", 9099)
//!     .language_code("en")
//!     .build()
//!     .expect("valid config");
//!
//! assert!(config.is_provider_enabled("google.com"));
//! ```
//!
//! ### Host JSON
//!
//! ```
//! use core_runtime::config::AuthConfig;
//! use serde_json::json;
//!
//! let config = AuthConfig::from_json(&json!({
//!     "skipNativeAuth": true,
//!     "providers": ["apple.com", "google.com"]
//! }))
//! .expect("valid config");
//!
//! assert!(config.skip_native_auth);
//! assert!(!config.is_provider_enabled("phone"));
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::AuthConfig;
//!
//! // Emulator without a host is rejected
//! let config = AuthConfig::builder()
//!     .emulator("", 9099)
//!     .build()
//!     .expect("Should fail - empty emulator host");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Port the auth emulator listens on unless told otherwise.
pub const DEFAULT_EMULATOR_PORT: u16 = 9099;

/// How long a redirect flow may wait for its activity result.
pub const DEFAULT_PENDING_FLOW_TIMEOUT: Duration = Duration::from_secs(300);

/// Providers enabled when the host configuration does not list any.
pub const DEFAULT_PROVIDERS: &[&str] = &[
    "apple.com",
    "facebook.com",
    "github.com",
    "google.com",
    "microsoft.com",
    "playgames.google.com",
    "twitter.com",
    "yahoo.com",
    "phone",
];

/// Auth emulator endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmulatorConfig {
    pub host: String,
    #[serde(default = "default_emulator_port")]
    pub port: u16,
}

fn default_emulator_port() -> u16 {
    DEFAULT_EMULATOR_PORT
}

/// Configuration for the authentication bridge.
///
/// Use [`AuthConfig::builder`] or [`AuthConfig::from_json`] to construct a
/// validated instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthConfig {
    /// Return upstream credential material without creating a native session
    pub skip_native_auth: bool,

    /// Enabled provider identifiers, in host order
    pub providers: Vec<String>,

    /// Auth emulator to route the SDK to at load time
    pub emulator: Option<EmulatorConfig>,

    /// Language code applied to SDK-sent emails/SMS at load time
    pub language_code: Option<String>,

    /// Expiry for redirect flows that never receive an activity result.
    /// `None` leaves such flows pending until the bridge shuts down.
    #[serde(rename = "pendingFlowTimeoutSecs", with = "optional_secs")]
    pub pending_flow_timeout: Option<Duration>,

    /// Buffer size of the auth event bus
    pub event_buffer_size: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            skip_native_auth: false,
            providers: DEFAULT_PROVIDERS.iter().map(|p| p.to_string()).collect(),
            emulator: None,
            language_code: None,
            pending_flow_timeout: Some(DEFAULT_PENDING_FLOW_TIMEOUT),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl AuthConfig {
    /// Creates a new builder seeded with the defaults.
    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::default()
    }

    /// Parses and validates the host's configuration object.
    ///
    /// Missing keys fall back to their defaults.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let config: AuthConfig = serde_json::from_value(value.clone())
            .map_err(|e| Error::Config(format!("Invalid bridge configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid bridge configuration: {}", e)))?;
        Self::from_json(&value)
    }

    /// Returns `true` when `provider_id` is in the enabled provider list.
    pub fn is_provider_enabled(&self, provider_id: &str) -> bool {
        self.providers.iter().any(|p| p == provider_id)
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Provider identifiers are non-empty and unique
    /// - The emulator endpoint, if any, has a host and a non-zero port
    /// - The pending-flow timeout, if any, is non-zero
    /// - The event buffer can hold at least one event
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.trim().is_empty() {
                return Err(Error::Config(
                    "Provider identifiers cannot be empty".to_string(),
                ));
            }
            if !seen.insert(provider.as_str()) {
                return Err(Error::Config(format!(
                    "Provider '{}' is listed more than once",
                    provider
                )));
            }
        }

        if let Some(emulator) = &self.emulator {
            if emulator.host.trim().is_empty() {
                return Err(Error::Config("Emulator host cannot be empty".to_string()));
            }
            if emulator.port == 0 {
                return Err(Error::Config(
                    "Emulator port must be greater than 0".to_string(),
                ));
            }
        }

        if self.pending_flow_timeout == Some(Duration::ZERO) {
            return Err(Error::Config(
                "Pending flow timeout must be greater than 0. \
                 Use no timeout to keep flows pending indefinitely."
                    .to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`AuthConfig`].
#[derive(Debug, Clone, Default)]
pub struct AuthConfigBuilder {
    config: AuthConfig,
}

impl AuthConfigBuilder {
    /// Enable or disable native session creation.
    pub fn skip_native_auth(mut self, skip: bool) -> Self {
        self.config.skip_native_auth = skip;
        self
    }

    /// Replace the enabled provider list.
    pub fn providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.providers = providers.into_iter().map(Into::into).collect();
        self
    }

    /// Append one provider to the enabled list.
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.config.providers.push(provider.into());
        self
    }

    /// Route the SDK to an auth emulator on load.
    pub fn emulator(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.emulator = Some(EmulatorConfig {
            host: host.into(),
            port,
        });
        self
    }

    /// Language code applied on load.
    pub fn language_code(mut self, language_code: impl Into<String>) -> Self {
        self.config.language_code = Some(language_code.into());
        self
    }

    /// Expiry for redirect flows; `None` disables expiry.
    pub fn pending_flow_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.pending_flow_timeout = timeout;
        self
    }

    /// Buffer size of the auth event bus.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.config.event_buffer_size = size;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<AuthConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

mod optional_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.map(|d| d.as_secs()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}
