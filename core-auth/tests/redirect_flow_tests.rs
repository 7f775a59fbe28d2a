//! Redirect/activity sign-in flows.
//!
//! This suite verifies:
//! - Every redirect provider launches with its reserved request code
//! - Cancellation and success outcomes for every provider
//! - One-shot correlation, duplicate flows and expiry

mod common;

use bridge_traits::{ActivityData, ActivityResult};
use common::{bridge, bridge_with, full_activity_data};
use core_auth::{AuthEvent, AuthMethod, CallResult, CorrelationKey, FailureKind};
use core_runtime::config::AuthConfig;
use serde_json::json;
use std::time::Duration;

fn method_for(key: CorrelationKey) -> &'static str {
    AuthMethod::ALL
        .into_iter()
        .find(|method| method.provider() == Some(key.provider()))
        .unwrap()
        .as_str()
}

#[tokio::test]
async fn test_every_provider_succeeds_exactly_once() {
    let t = bridge();

    for key in CorrelationKey::ALL {
        let pending = t.bridge.call(method_for(key), json!({})).await;
        let launch = t.host.last_launch().unwrap();
        assert_eq!(launch.request_code, key.code(), "{key}");
        assert_eq!(launch.provider_id, key.provider().as_str());

        assert!(
            t.bridge
                .handle_activity_result(key.code(), ActivityResult::ok(full_activity_data()))
                .await
        );
        let result = pending.await;
        let payload = result.payload().unwrap();
        assert_eq!(
            payload["user"]["uid"],
            format!("uid-{}", key.provider().as_str()),
            "{key}"
        );
        assert_eq!(payload["credential"]["providerId"], key.provider().as_str());

        // The code is consumed; a second delivery is a no-op
        assert!(
            !t.bridge
                .handle_activity_result(key.code(), ActivityResult::ok(full_activity_data()))
                .await
        );
    }

    assert!(t.bridge.pending_flows().await.is_empty());
}

#[tokio::test]
async fn test_every_provider_reports_cancellation() {
    let t = bridge();

    for key in CorrelationKey::ALL {
        let pending = t.bridge.call(method_for(key), json!({})).await;
        assert!(
            t.bridge
                .handle_activity_result(key.code(), ActivityResult::canceled())
                .await
        );

        let failure = pending.await.into_result().unwrap_err();
        assert!(failure.is_cancelled(), "{key}");
        assert_eq!(
            failure.message,
            format!("sign-in with {} was cancelled.", key.provider().display_name())
        );
    }

    assert!(t.bridge.current_user().is_none());
}

#[tokio::test]
async fn test_provider_error_is_not_cancellation() {
    let t = bridge();
    let pending = t.bridge.call("signInWithGoogle", json!({})).await;
    t.bridge
        .handle_activity_result(9001, ActivityResult::failed("12500: Sign-in failed"))
        .await;

    let failure = pending.await.into_result().unwrap_err();
    assert_eq!(failure.kind, FailureKind::Provider);
    assert_eq!(failure.message, "12500: Sign-in failed");
}

#[tokio::test]
async fn test_missing_credential_material_fails_sign_in() {
    let t = bridge();
    let pending = t.bridge.call("signInWithFacebook", json!({})).await;
    t.bridge
        .handle_activity_result(64206, ActivityResult::ok(ActivityData::default()))
        .await;
    assert_eq!(
        pending.await.into_result().unwrap_err().message,
        "signIn failed."
    );
}

#[tokio::test]
async fn test_foreign_request_codes_are_ignored() {
    let t = bridge();
    let pending = t.bridge.call("signInWithGoogle", json!({})).await;

    assert!(
        !t.bridge
            .handle_activity_result(1234, ActivityResult::canceled())
            .await
    );
    // Registered code of a provider with no pending flow
    assert!(
        !t.bridge
            .handle_activity_result(9003, ActivityResult::canceled())
            .await
    );
    assert_eq!(t.bridge.pending_flows().await.len(), 1);
    drop(pending);
}

#[tokio::test]
async fn test_launch_carries_options_and_nonce_digest() {
    let t = bridge();
    let pending = t
        .bridge
        .call(
            "signInWithMicrosoft",
            json!({
                "scopes": ["mail.read", "calendars.read"],
                "customParameters": [{ "key": "tenant", "value": "contoso" }],
            }),
        )
        .await;

    let launch = t.host.last_launch().unwrap();
    assert_eq!(launch.request_code, 9005);
    assert_eq!(launch.scopes, vec!["mail.read", "calendars.read"]);
    assert_eq!(launch.custom_parameters["tenant"], "contoso");
    let digest = launch.hashed_nonce.unwrap();
    assert_eq!(digest.len(), 64);

    t.bridge
        .handle_activity_result(9005, ActivityResult::ok(full_activity_data()))
        .await;
    let result = pending.await;
    let nonce = result.payload().unwrap()["credential"]["nonce"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(nonce.len(), 43);
}

#[tokio::test]
async fn test_second_begin_while_pending_is_rejected() {
    let t = bridge();
    let first = t.bridge.call("signInWithGithub", json!({})).await;

    let second = t.bridge.execute("signInWithGithub", json!({})).await;
    let failure = second.into_result().unwrap_err();
    assert_eq!(failure.kind, FailureKind::Precondition);
    assert_eq!(failure.message, "sign-in with GitHub is already in progress.");
    assert_eq!(t.host.launches().len(), 1);

    t.bridge
        .handle_activity_result(9003, ActivityResult::ok(full_activity_data()))
        .await;
    assert!(first.await.is_success());

    // Free again once resolved
    let _third = t.bridge.call("signInWithGithub", json!({})).await;
    assert_eq!(t.host.launches().len(), 2);
}

#[tokio::test]
async fn test_launch_failure_fails_call_and_frees_key() {
    let t = bridge();
    t.host.fail_launches("No activity found to handle Intent");

    let result = t.bridge.execute("signInWithGoogle", json!({})).await;
    assert_eq!(
        result.into_result().unwrap_err().message,
        "Activity launch failed: No activity found to handle Intent"
    );
    assert!(t.bridge.pending_flows().await.is_empty());
}

#[tokio::test]
async fn test_skip_native_auth_returns_credential_only() {
    let t = bridge_with(AuthConfig::builder().skip_native_auth(true).build().unwrap());

    let pending = t.bridge.call("signInWithGoogle", json!({})).await;
    t.bridge
        .handle_activity_result(9001, ActivityResult::ok(full_activity_data()))
        .await;

    let result = pending.await;
    let payload = result.payload().unwrap();
    assert!(payload["user"].is_null());
    assert_eq!(payload["credential"]["idToken"], "provider-id-token");
    assert!(t.sdk.calls().is_empty());
    assert!(t.bridge.current_user().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_flow_times_out() {
    let t = bridge_with(
        AuthConfig::builder()
            .pending_flow_timeout(Some(Duration::from_secs(60)))
            .build()
            .unwrap(),
    );
    let mut events = t.bridge.subscribe_events();

    let pending = t.bridge.call("signInWithPlayGames", json!({})).await;
    tokio::time::sleep(Duration::from_secs(61)).await;

    let failure = pending.await.into_result().unwrap_err();
    assert_eq!(failure.kind, FailureKind::Timeout);
    assert_eq!(failure.message, "sign-in with Play Games timed out after 60s.");

    let mut expired = None;
    while let Some(Ok(event)) = events.try_recv() {
        if let AuthEvent::PendingFlowExpired { key } = event {
            expired = Some(key);
        }
    }
    assert_eq!(expired, Some(CorrelationKey::PlayGames));

    // Late result for the expired flow is ignored
    assert!(
        !t.bridge
            .handle_activity_result(9004, ActivityResult::ok(full_activity_data()))
            .await
    );
}

#[tokio::test]
async fn test_shutdown_fails_pending_flows() {
    let t = bridge();
    let pending = t.bridge.call("signInWithYahoo", json!({})).await;

    t.bridge.shutdown().await;

    let result = pending.await;
    assert_eq!(result.failure().unwrap().kind, FailureKind::Internal);
    assert_ne!(result, CallResult::Success(None));
    assert_eq!(t.sdk.listener_count(), 0);
}

#[test]
fn test_redirect_flow_on_foreign_executor() {
    let t = bridge();

    let pending = futures::executor::block_on(t.bridge.call("signInWithGoogle", json!({})));
    assert_eq!(t.host.last_launch().unwrap().request_code, 9001);
    assert_eq!(futures::executor::block_on(t.bridge.pending_flows()).len(), 1);

    assert!(futures::executor::block_on(
        t.bridge
            .handle_activity_result(9001, ActivityResult::ok(full_activity_data()))
    ));
    let result = futures::executor::block_on(pending);
    assert_eq!(result.payload().unwrap()["user"]["uid"], "uid-google.com");
}
