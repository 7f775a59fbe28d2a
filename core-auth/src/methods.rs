//! # Call Surface
//!
//! Method names accepted by the bridge and up-front parameter validation.
//!
//! [`Operation::parse`] turns a method plus its raw parameters into a typed
//! operation, failing with the method's validation message before anything
//! reaches the identity SDK.

use std::collections::BTreeMap;
use std::fmt;

use core_runtime::config::DEFAULT_EMULATOR_PORT;

use crate::call::CallParams;
use crate::error::{
    AuthError, Result, ERROR_CUSTOM_TOKEN_SKIP_NATIVE_AUTH, ERROR_EMAIL_SIGN_IN_SKIP_NATIVE_AUTH,
    PHONE_SIGN_IN_PARAMETERS,
};
use crate::types::ProviderKind;

/// Every method of the call surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    ApplyActionCode,
    ConfirmPasswordReset,
    CreateUserWithEmailAndPassword,
    GetCurrentUser,
    GetIdToken,
    SendEmailVerification,
    SendPasswordResetEmail,
    SetLanguageCode,
    SignInWithApple,
    SignInWithCustomToken,
    SignInWithEmailAndPassword,
    SignInWithFacebook,
    SignInWithGithub,
    SignInWithGoogle,
    SignInWithMicrosoft,
    SignInWithPhoneNumber,
    SignInWithPlayGames,
    SignInWithTwitter,
    SignInWithYahoo,
    SignOut,
    UpdateEmail,
    UpdatePassword,
    UseAppLanguage,
    UseEmulator,
}

impl AuthMethod {
    pub const ALL: [AuthMethod; 24] = [
        AuthMethod::ApplyActionCode,
        AuthMethod::ConfirmPasswordReset,
        AuthMethod::CreateUserWithEmailAndPassword,
        AuthMethod::GetCurrentUser,
        AuthMethod::GetIdToken,
        AuthMethod::SendEmailVerification,
        AuthMethod::SendPasswordResetEmail,
        AuthMethod::SetLanguageCode,
        AuthMethod::SignInWithApple,
        AuthMethod::SignInWithCustomToken,
        AuthMethod::SignInWithEmailAndPassword,
        AuthMethod::SignInWithFacebook,
        AuthMethod::SignInWithGithub,
        AuthMethod::SignInWithGoogle,
        AuthMethod::SignInWithMicrosoft,
        AuthMethod::SignInWithPhoneNumber,
        AuthMethod::SignInWithPlayGames,
        AuthMethod::SignInWithTwitter,
        AuthMethod::SignInWithYahoo,
        AuthMethod::SignOut,
        AuthMethod::UpdateEmail,
        AuthMethod::UpdatePassword,
        AuthMethod::UseAppLanguage,
        AuthMethod::UseEmulator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::ApplyActionCode => "applyActionCode",
            AuthMethod::ConfirmPasswordReset => "confirmPasswordReset",
            AuthMethod::CreateUserWithEmailAndPassword => "createUserWithEmailAndPassword",
            AuthMethod::GetCurrentUser => "getCurrentUser",
            AuthMethod::GetIdToken => "getIdToken",
            AuthMethod::SendEmailVerification => "sendEmailVerification",
            AuthMethod::SendPasswordResetEmail => "sendPasswordResetEmail",
            AuthMethod::SetLanguageCode => "setLanguageCode",
            AuthMethod::SignInWithApple => "signInWithApple",
            AuthMethod::SignInWithCustomToken => "signInWithCustomToken",
            AuthMethod::SignInWithEmailAndPassword => "signInWithEmailAndPassword",
            AuthMethod::SignInWithFacebook => "signInWithFacebook",
            AuthMethod::SignInWithGithub => "signInWithGithub",
            AuthMethod::SignInWithGoogle => "signInWithGoogle",
            AuthMethod::SignInWithMicrosoft => "signInWithMicrosoft",
            AuthMethod::SignInWithPhoneNumber => "signInWithPhoneNumber",
            AuthMethod::SignInWithPlayGames => "signInWithPlayGames",
            AuthMethod::SignInWithTwitter => "signInWithTwitter",
            AuthMethod::SignInWithYahoo => "signInWithYahoo",
            AuthMethod::SignOut => "signOut",
            AuthMethod::UpdateEmail => "updateEmail",
            AuthMethod::UpdatePassword => "updatePassword",
            AuthMethod::UseAppLanguage => "useAppLanguage",
            AuthMethod::UseEmulator => "useEmulator",
        }
    }

    /// Method names are matched exactly.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.as_str() == name)
    }

    /// Provider a sign-in method goes through, `None` for everything else.
    pub fn provider(&self) -> Option<ProviderKind> {
        match self {
            AuthMethod::CreateUserWithEmailAndPassword | AuthMethod::SignInWithEmailAndPassword => {
                Some(ProviderKind::EmailPassword)
            }
            AuthMethod::SignInWithCustomToken => Some(ProviderKind::CustomToken),
            AuthMethod::SignInWithPhoneNumber => Some(ProviderKind::Phone),
            AuthMethod::SignInWithApple => Some(ProviderKind::Apple),
            AuthMethod::SignInWithFacebook => Some(ProviderKind::Facebook),
            AuthMethod::SignInWithGithub => Some(ProviderKind::GitHub),
            AuthMethod::SignInWithGoogle => Some(ProviderKind::Google),
            AuthMethod::SignInWithMicrosoft => Some(ProviderKind::Microsoft),
            AuthMethod::SignInWithPlayGames => Some(ProviderKind::PlayGames),
            AuthMethod::SignInWithTwitter => Some(ProviderKind::Twitter),
            AuthMethod::SignInWithYahoo => Some(ProviderKind::Yahoo),
            _ => None,
        }
    }

    /// Conflict raised when the method is called with `skipNativeAuth` on.
    pub fn skip_native_auth_conflict(&self) -> Option<AuthError> {
        match self {
            AuthMethod::SignInWithCustomToken => Some(AuthError::ConfigurationConflict(
                ERROR_CUSTOM_TOKEN_SKIP_NATIVE_AUTH,
            )),
            AuthMethod::CreateUserWithEmailAndPassword | AuthMethod::SignInWithEmailAndPassword => {
                Some(AuthError::ConfigurationConflict(
                    ERROR_EMAIL_SIGN_IN_SKIP_NATIVE_AUTH,
                ))
            }
            _ => None,
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options accepted by every federated sign-in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FederatedOptions {
    pub scopes: Vec<String>,
    pub custom_parameters: BTreeMap<String, String>,
}

/// Phone sign-in input: start verification, or finish it with the SMS code.
#[derive(Clone, PartialEq, Eq)]
pub enum PhoneInput {
    SendCode {
        phone_number: String,
    },
    VerifyCode {
        verification_id: String,
        verification_code: String,
    },
}

impl fmt::Debug for PhoneInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhoneInput::SendCode { .. } => f
                .debug_struct("SendCode")
                .field("phone_number", &"[REDACTED]")
                .finish(),
            PhoneInput::VerifyCode {
                verification_id, ..
            } => f
                .debug_struct("VerifyCode")
                .field("verification_id", verification_id)
                .field("verification_code", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Validated input of a sign-in call.
#[derive(Clone, PartialEq, Eq)]
pub enum SignInInput {
    EmailPassword {
        email: String,
        password: String,
        create: bool,
    },
    CustomToken {
        token: String,
    },
    Phone(PhoneInput),
    Federated(FederatedOptions),
}

impl fmt::Debug for SignInInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignInInput::EmailPassword { create, .. } => f
                .debug_struct("EmailPassword")
                .field("create", create)
                .finish_non_exhaustive(),
            SignInInput::CustomToken { .. } => f.debug_struct("CustomToken").finish_non_exhaustive(),
            SignInInput::Phone(input) => f.debug_tuple("Phone").field(input).finish(),
            SignInInput::Federated(options) => f.debug_tuple("Federated").field(options).finish(),
        }
    }
}

/// A sign-in call routed to one provider handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCall {
    pub method: AuthMethod,
    pub provider: ProviderKind,
    pub input: SignInInput,
}

/// A fully validated call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    ApplyActionCode { oob_code: String },
    ConfirmPasswordReset { oob_code: String, new_password: String },
    GetCurrentUser,
    GetIdToken { force_refresh: bool },
    SendEmailVerification,
    SendPasswordResetEmail { email: String },
    SetLanguageCode { language_code: String },
    SignIn(ProviderCall),
    SignOut,
    UpdateEmail { new_email: String },
    UpdatePassword { new_password: String },
    UseAppLanguage,
    UseEmulator { host: String, port: u16 },
}

impl Operation {
    /// Validate `params` for `method`.
    ///
    /// # Errors
    ///
    /// `MissingParameter` for absent required parameters and
    /// `InvalidParameter` for present ones of the wrong type.
    pub fn parse(method: AuthMethod, params: &CallParams) -> Result<Self> {
        let operation = match method {
            AuthMethod::ApplyActionCode => Operation::ApplyActionCode {
                oob_code: params.require_string("oobCode")?,
            },
            AuthMethod::ConfirmPasswordReset => Operation::ConfirmPasswordReset {
                oob_code: params.require_string("oobCode")?,
                new_password: params.require_string("newPassword")?,
            },
            AuthMethod::GetCurrentUser => Operation::GetCurrentUser,
            AuthMethod::GetIdToken => Operation::GetIdToken {
                force_refresh: params.get_bool("forceRefresh", false)?,
            },
            AuthMethod::SendEmailVerification => Operation::SendEmailVerification,
            AuthMethod::SendPasswordResetEmail => Operation::SendPasswordResetEmail {
                email: params.require_string("email")?,
            },
            AuthMethod::SetLanguageCode => Operation::SetLanguageCode {
                language_code: params.get_string("languageCode")?.unwrap_or_default(),
            },
            AuthMethod::SignOut => Operation::SignOut,
            AuthMethod::UpdateEmail => Operation::UpdateEmail {
                new_email: params.require_string("newEmail")?,
            },
            AuthMethod::UpdatePassword => Operation::UpdatePassword {
                new_password: params.require_string("newPassword")?,
            },
            AuthMethod::UseAppLanguage => Operation::UseAppLanguage,
            AuthMethod::UseEmulator => Operation::UseEmulator {
                host: params.require_string("host")?,
                port: params.get_port("port", DEFAULT_EMULATOR_PORT)?,
            },
            sign_in => {
                let provider = sign_in
                    .provider()
                    .ok_or_else(|| AuthError::Internal(format!("{sign_in} has no provider")))?;
                Operation::SignIn(ProviderCall {
                    method: sign_in,
                    provider,
                    input: parse_sign_in_input(sign_in, provider, params)?,
                })
            }
        };

        Ok(operation)
    }
}

fn parse_sign_in_input(
    method: AuthMethod,
    provider: ProviderKind,
    params: &CallParams,
) -> Result<SignInInput> {
    match provider {
        ProviderKind::EmailPassword => Ok(SignInInput::EmailPassword {
            email: params.require_string("email")?,
            password: params.require_string("password")?,
            create: method == AuthMethod::CreateUserWithEmailAndPassword,
        }),
        ProviderKind::CustomToken => Ok(SignInInput::CustomToken {
            token: params.require_string("token")?,
        }),
        ProviderKind::Phone => parse_phone_input(params).map(SignInInput::Phone),
        _ => Ok(SignInInput::Federated(FederatedOptions {
            scopes: params.get_string_list("scopes")?,
            custom_parameters: params.get_string_map("customParameters")?,
        })),
    }
}

fn parse_phone_input(params: &CallParams) -> Result<PhoneInput> {
    let phone_number = params.get_string("phoneNumber")?;
    let verification_id = params.get_string("verificationId")?;
    let verification_code = params.get_string("verificationCode")?;

    match (phone_number, verification_id, verification_code) {
        (_, Some(verification_id), Some(verification_code)) => Ok(PhoneInput::VerifyCode {
            verification_id,
            verification_code,
        }),
        (Some(phone_number), _, _) => Ok(PhoneInput::SendCode { phone_number }),
        _ => Err(AuthError::MissingParameter(
            PHONE_SIGN_IN_PARAMETERS.to_string(),
        )),
    }
}
