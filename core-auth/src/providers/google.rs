use async_trait::async_trait;
use bridge_traits::{ActivityResult, AuthCredential};
use serde_json::Value;
use tracing::{info, instrument};

use super::{
    activity_request, federated_options, successful_data, ActivityLaunch, FlowStart, FlowState,
    ProviderContext, ProviderHandler,
};
use crate::error::{AuthError, Result, ERROR_SIGN_IN_FAILED};
use crate::methods::ProviderCall;
use crate::types::{CorrelationKey, ProviderKind};

/// Google Sign-In through the host's sign-in activity.
#[derive(Debug)]
pub struct GoogleHandler {
    context: ProviderContext,
}

impl GoogleHandler {
    pub fn new(context: ProviderContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl ProviderHandler for GoogleHandler {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    async fn begin(&self, call: &ProviderCall) -> Result<FlowStart> {
        let options = federated_options(self.kind(), call)?;
        let key = CorrelationKey::Google;
        Ok(FlowStart::Launch(ActivityLaunch {
            key,
            request: activity_request(key, options, None),
            state: FlowState::new(self.kind()),
        }))
    }

    #[instrument(skip(self, state, result))]
    async fn finish(&self, state: FlowState, result: ActivityResult) -> Result<Option<Value>> {
        let data = successful_data(result)?;
        // The ID token is what the identity SDK exchanges; the access token is
        // passed along when the requested scopes produced one.
        let id_token = data
            .id_token
            .ok_or_else(|| AuthError::Provider(ERROR_SIGN_IN_FAILED.to_string()))?;

        let value = self
            .context
            .complete_with_credential(AuthCredential::OAuth {
                provider_id: state.provider.as_str().to_string(),
                id_token: Some(id_token),
                access_token: data.access_token,
                secret: None,
                raw_nonce: None,
            })
            .await?;
        info!("Signed in with Google");
        Ok(Some(value))
    }

    async fn on_sign_out(&self) -> Result<()> {
        self.context
            .host
            .sign_out_provider(self.kind().as_str())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::{AuthMethod, FederatedOptions, SignInInput};
    use crate::providers::test_support::*;
    use bridge_traits::ActivityData;

    #[tokio::test]
    async fn test_begin_describes_sign_in_activity() {
        let handler = GoogleHandler::new(context(MockSdk::new(), MockHost::new(), false));
        let call = ProviderCall {
            method: AuthMethod::SignInWithGoogle,
            provider: ProviderKind::Google,
            input: SignInInput::Federated(FederatedOptions {
                scopes: vec!["https://www.googleapis.com/auth/drive.readonly".to_string()],
                ..FederatedOptions::default()
            }),
        };

        let FlowStart::Launch(launch) = handler.begin(&call).await.unwrap() else {
            panic!("expected an activity launch");
        };
        assert_eq!(launch.key, CorrelationKey::Google);
        assert_eq!(launch.request.request_code, 9001);
        assert_eq!(launch.request.provider_id, "google.com");
        assert_eq!(launch.request.scopes.len(), 1);
        assert!(launch.request.hashed_nonce.is_none());
    }

    #[tokio::test]
    async fn test_finish_without_id_token_fails() {
        let handler = GoogleHandler::new(context(MockSdk::new(), MockHost::new(), false));
        let result = ActivityResult::ok(ActivityData {
            access_token: Some("ya29".to_string()),
            ..ActivityData::default()
        });

        let error = handler
            .finish(FlowState::new(ProviderKind::Google), result)
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), ERROR_SIGN_IN_FAILED);
    }

    #[tokio::test]
    async fn test_sign_out_reaches_host() {
        let mut host = MockHost::new();
        host.expect_sign_out_provider()
            .withf(|provider_id| provider_id == "google.com")
            .times(1)
            .returning(|_| Ok(()));

        let handler = GoogleHandler::new(context(MockSdk::new(), host, false));
        handler.on_sign_out().await.unwrap();
    }
}
