use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The identity SDK rejected the operation. The message is the SDK's own
    /// localized message and is surfaced to callers unchanged.
    #[error("{0}")]
    Rejected(String),

    #[error("Activity launch failed: {0}")]
    LaunchFailed(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
