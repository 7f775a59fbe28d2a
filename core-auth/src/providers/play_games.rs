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

/// Play Games sign-in; the activity hands back a server auth code.
#[derive(Debug)]
pub struct PlayGamesHandler {
    context: ProviderContext,
}

impl PlayGamesHandler {
    pub fn new(context: ProviderContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl ProviderHandler for PlayGamesHandler {
    fn kind(&self) -> ProviderKind {
        ProviderKind::PlayGames
    }

    async fn begin(&self, call: &ProviderCall) -> Result<FlowStart> {
        let options = federated_options(self.kind(), call)?;
        let key = CorrelationKey::PlayGames;
        Ok(FlowStart::Launch(ActivityLaunch {
            key,
            request: activity_request(key, options, None),
            state: FlowState::new(self.kind()),
        }))
    }

    #[instrument(skip(self, _state, result))]
    async fn finish(&self, _state: FlowState, result: ActivityResult) -> Result<Option<Value>> {
        let server_auth_code = successful_data(result)?
            .server_auth_code
            .ok_or_else(|| AuthError::Provider(ERROR_SIGN_IN_FAILED.to_string()))?;

        let value = self
            .context
            .complete_with_credential(AuthCredential::PlayGames { server_auth_code })
            .await?;
        info!("Signed in with Play Games");
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
