use std::path::PathBuf;
use thiserror::Error;

/// Failures loading or querying the accounts configuration.
#[derive(Debug, Error)]
pub enum AccountsError {
    #[error("accounts configuration file not found at {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read accounts configuration: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse accounts configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid accounts configuration: {0}")]
    Invalid(String),

    #[error("no default account configured")]
    NoDefaultAccount,

    #[error("account not found: {0}")]
    AccountNotFound(String),
}

impl AccountsError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        AccountsError::Invalid(message.into())
    }
}
