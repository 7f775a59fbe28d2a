//! In-memory identity SDK and activity host shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    ActivityData, ActivityHost, ActivityRequest, AuthCredential, AuthStateCallback, BridgeError,
    IdentitySdk, ListenerToken, NativeUser, NativeUserHandle, NativeUserInfo, PhoneVerification,
};
use core_auth::AuthBridge;
use core_runtime::config::AuthConfig;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Fake user
// ============================================================================

pub struct FakeUser {
    pub uid: String,
    pub email: Option<String>,
    pub provider_id: String,
    sdk_calls: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl NativeUser for FakeUser {
    fn uid(&self) -> String {
        self.uid.clone()
    }

    fn email(&self) -> Option<String> {
        self.email.clone()
    }

    fn display_name(&self) -> Option<String> {
        None
    }

    fn phone_number(&self) -> Option<String> {
        None
    }

    fn photo_url(&self) -> Option<String> {
        None
    }

    fn provider_id(&self) -> String {
        "firebase".to_string()
    }

    fn tenant_id(&self) -> Option<String> {
        None
    }

    fn is_email_verified(&self) -> bool {
        false
    }

    fn is_anonymous(&self) -> bool {
        false
    }

    fn provider_data(&self) -> Vec<NativeUserInfo> {
        vec![NativeUserInfo {
            provider_id: self.provider_id.clone(),
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: None,
            phone_number: None,
            photo_url: None,
        }]
    }

    async fn get_id_token(&self, force_refresh: bool) -> BridgeResult<String> {
        self.record(format!("getIdToken({force_refresh})"));
        Ok(format!("id-token-{}", self.uid))
    }

    async fn send_email_verification(&self) -> BridgeResult<()> {
        self.record("sendEmailVerification".to_string());
        Ok(())
    }

    async fn update_email(&self, new_email: &str) -> BridgeResult<()> {
        self.record(format!("updateEmail({new_email})"));
        Ok(())
    }

    async fn update_password(&self, _new_password: &str) -> BridgeResult<()> {
        self.record("updatePassword".to_string());
        Ok(())
    }
}

impl FakeUser {
    fn record(&self, call: String) {
        self.sdk_calls.lock().unwrap().push(call);
    }
}

// ============================================================================
// Fake identity SDK
// ============================================================================

/// Identity SDK keeping accounts and the signed-in user in memory.
///
/// Every SDK call is recorded; auth-state listeners fire on each sign-in and
/// sign-out, outside of any internal lock.
#[derive(Default)]
pub struct FakeSdk {
    current: Mutex<Option<Arc<FakeUser>>>,
    accounts: Mutex<HashMap<String, String>>,
    listeners: Mutex<BTreeMap<u64, AuthStateCallback>>,
    next_token: AtomicU64,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeSdk {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// SDK calls made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    pub fn add_account(&self, email: &str, password: &str) {
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), password.to_string());
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn set_current(&self, user: Option<Arc<FakeUser>>) {
        *self.current.lock().unwrap() = user;
        let listeners: Vec<AuthStateCallback> =
            self.listeners.lock().unwrap().values().cloned().collect();
        for listener in listeners {
            listener();
        }
    }

    fn sign_in_as(&self, uid: &str, email: Option<&str>, provider_id: &str) -> NativeUserHandle {
        let user = Arc::new(FakeUser {
            uid: uid.to_string(),
            email: email.map(str::to_string),
            provider_id: provider_id.to_string(),
            sdk_calls: Arc::clone(&self.calls),
        });
        self.set_current(Some(Arc::clone(&user)));
        user
    }
}

#[async_trait]
impl IdentitySdk for FakeSdk {
    fn current_user(&self) -> Option<NativeUserHandle> {
        self.current
            .lock()
            .unwrap()
            .clone()
            .map(|user| user as NativeUserHandle)
    }

    async fn sign_in_with_credential(
        &self,
        credential: AuthCredential,
    ) -> BridgeResult<NativeUserHandle> {
        let provider_id = credential.provider_id().to_string();
        self.record(format!("signInWithCredential({provider_id})"));
        Ok(self.sign_in_as(&format!("uid-{provider_id}"), None, &provider_id))
    }

    async fn sign_in_with_custom_token(&self, token: &str) -> BridgeResult<NativeUserHandle> {
        self.record("signInWithCustomToken");
        if token == "malformed" {
            return Err(BridgeError::Rejected(
                "The custom token format is incorrect.".to_string(),
            ));
        }
        Ok(self.sign_in_as(token, None, "custom"))
    }

    async fn sign_in_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> BridgeResult<NativeUserHandle> {
        self.record("signInWithEmailAndPassword");
        let known = self.accounts.lock().unwrap().get(email).cloned();
        match known {
            Some(expected) if expected == password => {
                Ok(self.sign_in_as(&format!("uid-{email}"), Some(email), "password"))
            }
            _ => Err(BridgeError::Rejected(
                "The password is invalid or the user does not have a password.".to_string(),
            )),
        }
    }

    async fn create_user_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> BridgeResult<NativeUserHandle> {
        self.record("createUserWithEmailAndPassword");
        self.add_account(email, password);
        Ok(self.sign_in_as(&format!("uid-{email}"), Some(email), "password"))
    }

    async fn verify_phone_number(&self, phone_number: &str) -> BridgeResult<PhoneVerification> {
        self.record("verifyPhoneNumber");
        // Test numbers ending in 0000 verify instantly
        if phone_number.ends_with("0000") {
            return Ok(PhoneVerification::AutoVerified(AuthCredential::Phone {
                verification_id: "instant".to_string(),
                verification_code: "000000".to_string(),
            }));
        }
        Ok(PhoneVerification::CodeSent {
            verification_id: format!("verification-{phone_number}"),
        })
    }

    async fn apply_action_code(&self, _oob_code: &str) -> BridgeResult<()> {
        self.record("applyActionCode");
        Ok(())
    }

    async fn confirm_password_reset(&self, _oob_code: &str, _new_password: &str) -> BridgeResult<()> {
        self.record("confirmPasswordReset");
        Ok(())
    }

    async fn send_password_reset_email(&self, _email: &str) -> BridgeResult<()> {
        self.record("sendPasswordResetEmail");
        Ok(())
    }

    async fn sign_out(&self) -> BridgeResult<()> {
        self.record("signOut");
        self.set_current(None);
        Ok(())
    }

    fn set_language_code(&self, language_code: &str) {
        self.record(format!("setLanguageCode({language_code})"));
    }

    fn use_app_language(&self) {
        self.record("useAppLanguage");
    }

    fn use_emulator(&self, host: &str, port: u16) {
        self.record(format!("useEmulator({host}:{port})"));
    }

    fn add_auth_state_listener(&self, callback: AuthStateCallback) -> ListenerToken {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().unwrap().insert(token, callback);
        ListenerToken(token)
    }

    fn remove_auth_state_listener(&self, token: ListenerToken) {
        self.listeners.lock().unwrap().remove(&token.0);
    }
}

// ============================================================================
// Fake activity host
// ============================================================================

#[derive(Default)]
pub struct FakeHost {
    launches: Mutex<Vec<ActivityRequest>>,
    provider_sign_outs: Mutex<Vec<String>>,
    launch_error: Mutex<Option<String>>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn launches(&self) -> Vec<ActivityRequest> {
        self.launches.lock().unwrap().clone()
    }

    pub fn last_launch(&self) -> Option<ActivityRequest> {
        self.launches.lock().unwrap().last().cloned()
    }

    pub fn provider_sign_outs(&self) -> Vec<String> {
        self.provider_sign_outs.lock().unwrap().clone()
    }

    /// Make every following launch fail with `message`.
    pub fn fail_launches(&self, message: &str) {
        *self.launch_error.lock().unwrap() = Some(message.to_string());
    }
}

#[async_trait]
impl ActivityHost for FakeHost {
    async fn launch(&self, request: ActivityRequest) -> BridgeResult<()> {
        if let Some(message) = self.launch_error.lock().unwrap().clone() {
            return Err(BridgeError::LaunchFailed(message));
        }
        self.launches.lock().unwrap().push(request);
        Ok(())
    }

    async fn sign_out_provider(&self, provider_id: &str) -> BridgeResult<()> {
        self.provider_sign_outs
            .lock()
            .unwrap()
            .push(provider_id.to_string());
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub struct TestBridge {
    pub bridge: AuthBridge,
    pub sdk: Arc<FakeSdk>,
    pub host: Arc<FakeHost>,
}

pub fn bridge_with(config: AuthConfig) -> TestBridge {
    let sdk = FakeSdk::new();
    let host = FakeHost::new();
    let bridge = AuthBridge::new(config, sdk.clone(), host.clone()).unwrap();
    TestBridge { bridge, sdk, host }
}

/// Bridge with every provider enabled.
pub fn bridge() -> TestBridge {
    bridge_with(AuthConfig::default())
}

/// Activity payload carrying every kind of credential material.
pub fn full_activity_data() -> ActivityData {
    ActivityData {
        id_token: Some("provider-id-token".to_string()),
        access_token: Some("provider-access-token".to_string()),
        secret: None,
        server_auth_code: Some("server-auth-code".to_string()),
        error_message: None,
    }
}
