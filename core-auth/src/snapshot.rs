//! # Auth User Snapshot
//!
//! Immutable, serializable view of the identity SDK's signed-in user.
//!
//! Snapshots are rebuilt from the native handle on every read and never
//! mutated in place, so a snapshot handed to a listener can't drift from what
//! the SDK reported at that moment.

use bridge_traits::{IdentitySdk, NativeUser, NativeUserInfo};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Serializable snapshot of a signed-in user.
///
/// # Security
///
/// The `Debug` implementation redacts the email address and ID token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUserSnapshot {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: bool,
    pub is_anonymous: bool,
    pub tenant_id: Option<String>,
    pub provider_id: String,
    /// One entry per linked provider
    pub provider_data: Vec<NativeUserInfo>,
    /// Short-lived ID token cached by the SDK, if any
    pub id_token: Option<String>,
}

impl AuthUserSnapshot {
    /// Build a snapshot from a native user handle.
    pub fn from_native(user: &dyn NativeUser) -> Self {
        Self {
            uid: user.uid(),
            email: user.email(),
            display_name: user.display_name(),
            phone_number: user.phone_number(),
            photo_url: user.photo_url(),
            email_verified: user.is_email_verified(),
            is_anonymous: user.is_anonymous(),
            tenant_id: user.tenant_id(),
            provider_id: user.provider_id(),
            provider_data: user.provider_data(),
            id_token: user.cached_id_token(),
        }
    }

    /// Snapshot of the SDK's current user, or `None` when signed out.
    pub fn from_current(sdk: &dyn IdentitySdk) -> Option<Self> {
        sdk.current_user().map(|user| Self::from_native(user.as_ref()))
    }

    /// Identifiers of every provider linked to this user.
    pub fn linked_providers(&self) -> Vec<&str> {
        self.provider_data
            .iter()
            .map(|info| info.provider_id.as_str())
            .collect()
    }
}

impl fmt::Debug for AuthUserSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthUserSnapshot")
            .field("uid", &self.uid)
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("email_verified", &self.email_verified)
            .field("is_anonymous", &self.is_anonymous)
            .field("provider_id", &self.provider_id)
            .field("linked_providers", &self.linked_providers())
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
