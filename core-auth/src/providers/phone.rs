use async_trait::async_trait;
use bridge_traits::{AuthCredential, PhoneVerification};
use serde_json::json;
use tracing::{debug, info, instrument};

use super::{unexpected_input, FlowStart, ProviderContext, ProviderHandler};
use crate::error::Result;
use crate::methods::{PhoneInput, ProviderCall, SignInInput};
use crate::types::ProviderKind;

/// SMS sign-in.
///
/// A call with `phoneNumber` starts verification and either completes with
/// `{ verificationId }` (code sent) or signs in directly when the SDK
/// verified the number on its own. A call with `verificationId` and
/// `verificationCode` finishes a verification started earlier.
#[derive(Debug)]
pub struct PhoneHandler {
    context: ProviderContext,
}

impl PhoneHandler {
    pub fn new(context: ProviderContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl ProviderHandler for PhoneHandler {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Phone
    }

    #[instrument(skip(self, call))]
    async fn begin(&self, call: &ProviderCall) -> Result<FlowStart> {
        let SignInInput::Phone(input) = &call.input else {
            return Err(unexpected_input(self.kind(), call));
        };

        let credential = match input {
            PhoneInput::SendCode { phone_number } => {
                match self.context.sdk.verify_phone_number(phone_number).await? {
                    PhoneVerification::CodeSent { verification_id } => {
                        debug!(%verification_id, "Verification code sent");
                        return Ok(FlowStart::Complete(Some(
                            json!({ "verificationId": verification_id }),
                        )));
                    }
                    PhoneVerification::AutoVerified(credential) => {
                        debug!("Phone number verified without a code");
                        credential
                    }
                }
            }
            PhoneInput::VerifyCode {
                verification_id,
                verification_code,
            } => AuthCredential::Phone {
                verification_id: verification_id.clone(),
                verification_code: verification_code.clone(),
            },
        };

        let value = self.context.complete_with_credential(credential).await?;
        info!("Signed in with phone number");
        Ok(FlowStart::Complete(Some(value)))
    }
}
