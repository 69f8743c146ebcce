use thiserror::Error;

use super::accounts_error::AccountsError;
use crate::accounts::Product;

/// Failures while resolving an account into a usable token.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("no default account configured")]
    NoDefaultAccount,

    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// `problem` reads as a predicate, e.g. "not found" or "has an unusable token".
    #[error("{product} configuration {problem} for account: {account}")]
    AccountConfigInvalid {
        account: String,
        product: Product,
        problem: &'static str,
    },

    #[error("accounts lookup failed: {0}")]
    Store(#[source] AccountsError),

    #[error("token resolution aborted: {0}")]
    Aborted(String),
}

impl TokenError {
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::NoDefaultAccount => "NO_DEFAULT_ACCOUNT",
            TokenError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            TokenError::AccountConfigInvalid { .. } => "ACCOUNT_CONFIG_INVALID",
            TokenError::Store(_) => "ACCOUNTS_STORE_ERROR",
            TokenError::Aborted(_) => "TOKEN_ABORTED",
        }
    }
}

/// Keeps the two lookup misses distinct; every other store failure is
/// carried through with its cause.
impl From<AccountsError> for TokenError {
    fn from(err: AccountsError) -> Self {
        match err {
            AccountsError::NoDefaultAccount => TokenError::NoDefaultAccount,
            AccountsError::AccountNotFound(name) => TokenError::AccountNotFound(name),
            other => TokenError::Store(other),
        }
    }
}
