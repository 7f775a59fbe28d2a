use async_trait::async_trait;
use core_runtime::logging::redact_if_sensitive;
use tracing::{info, instrument};

use super::{unexpected_input, FlowStart, ProviderContext, ProviderHandler};
use crate::error::Result;
use crate::methods::{ProviderCall, SignInInput};
use crate::types::ProviderKind;

/// Email/password sign-in and account creation.
#[derive(Debug)]
pub struct EmailPasswordHandler {
    context: ProviderContext,
}

impl EmailPasswordHandler {
    pub fn new(context: ProviderContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl ProviderHandler for EmailPasswordHandler {
    fn kind(&self) -> ProviderKind {
        ProviderKind::EmailPassword
    }

    #[instrument(skip(self, call), fields(method = %call.method))]
    async fn begin(&self, call: &ProviderCall) -> Result<FlowStart> {
        let SignInInput::EmailPassword {
            email,
            password,
            create,
        } = &call.input
        else {
            return Err(unexpected_input(self.kind(), call));
        };

        let sdk = &self.context.sdk;
        let user = if *create {
            sdk.create_user_with_email_and_password(email, password)
                .await?
        } else {
            sdk.sign_in_with_email_and_password(email, password).await?
        };

        info!(
            email = %redact_if_sensitive("email", email),
            created = *create,
            "Signed in with email and password"
        );
        Ok(FlowStart::Complete(Some(self.context.user_result(&user))))
    }
}
