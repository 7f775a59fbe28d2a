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

/// Facebook Login. The login manager reports on its own fixed request code.
#[derive(Debug)]
pub struct FacebookHandler {
    context: ProviderContext,
}

impl FacebookHandler {
    pub fn new(context: ProviderContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl ProviderHandler for FacebookHandler {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Facebook
    }

    async fn begin(&self, call: &ProviderCall) -> Result<FlowStart> {
        let options = federated_options(self.kind(), call)?;
        let key = CorrelationKey::Facebook;
        Ok(FlowStart::Launch(ActivityLaunch {
            key,
            request: activity_request(key, options, None),
            state: FlowState::new(self.kind()),
        }))
    }

    #[instrument(skip(self, state, result))]
    async fn finish(&self, state: FlowState, result: ActivityResult) -> Result<Option<Value>> {
        let access_token = successful_data(result)?
            .access_token
            .ok_or_else(|| AuthError::Provider(ERROR_SIGN_IN_FAILED.to_string()))?;

        let value = self
            .context
            .complete_with_credential(AuthCredential::OAuth {
                provider_id: state.provider.as_str().to_string(),
                id_token: None,
                access_token: Some(access_token),
                secret: None,
                raw_nonce: None,
            })
            .await?;
        info!("Signed in with Facebook");
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
