use async_trait::async_trait;
use tracing::{info, instrument};

use super::{unexpected_input, FlowStart, ProviderContext, ProviderHandler};
use crate::error::Result;
use crate::methods::{ProviderCall, SignInInput};
use crate::types::ProviderKind;

/// Sign-in with a custom token minted by the app's backend.
#[derive(Debug)]
pub struct CustomTokenHandler {
    context: ProviderContext,
}

impl CustomTokenHandler {
    pub fn new(context: ProviderContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl ProviderHandler for CustomTokenHandler {
    fn kind(&self) -> ProviderKind {
        ProviderKind::CustomToken
    }

    #[instrument(skip(self, call))]
    async fn begin(&self, call: &ProviderCall) -> Result<FlowStart> {
        let SignInInput::CustomToken { token } = &call.input else {
            return Err(unexpected_input(self.kind(), call));
        };

        let user = self.context.sdk.sign_in_with_custom_token(token).await?;
        info!(uid = %user.uid(), "Signed in with custom token");
        Ok(FlowStart::Complete(Some(self.context.user_result(&user))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::{AuthMethod, FederatedOptions};
    use crate::providers::test_support::*;

    #[tokio::test]
    async fn test_custom_token_sign_in() {
        let mut sdk = MockSdk::new();
        sdk.expect_sign_in_with_custom_token()
            .withf(|token| token == "minted")
            .times(1)
            .returning(|_| Ok(TestUser::handle("uid-custom", None)));

        let handler = CustomTokenHandler::new(context(sdk, MockHost::new(), false));
        let call = ProviderCall {
            method: AuthMethod::SignInWithCustomToken,
            provider: ProviderKind::CustomToken,
            input: SignInInput::CustomToken {
                token: "minted".to_string(),
            },
        };

        let FlowStart::Complete(Some(value)) = handler.begin(&call).await.unwrap() else {
            panic!("expected an immediate result");
        };
        assert_eq!(value["user"]["uid"], "uid-custom");
    }

    #[tokio::test]
    async fn test_rejects_foreign_input() {
        let handler = CustomTokenHandler::new(context(MockSdk::new(), MockHost::new(), false));
        let call = ProviderCall {
            method: AuthMethod::SignInWithGoogle,
            provider: ProviderKind::Google,
            input: SignInInput::Federated(FederatedOptions::default()),
        };
        assert!(handler.begin(&call).await.is_err());
    }
}
