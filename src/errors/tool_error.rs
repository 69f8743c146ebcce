use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt;

use super::accounts_error::AccountsError;
use super::client_error::{ClientError, ErrorKind, OperationError};
use super::token_error::TokenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    InvalidParams,
    Denied,
    NotFound,
    Conflict,
    Timeout,
    Upstream,
    Internal,
}

/// Failure reported by a tool handler. The invocation middleware turns it
/// into a result envelope; it never reaches the protocol error channel.
#[derive(Debug, Clone, Serialize)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            hint: None,
            details: None,
            status_code: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidParams, "INVALID_PARAMS", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound, "NOT_FOUND", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Internal, "INTERNAL", message)
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ToolError {}

fn kind_for_client_error(err: &ClientError) -> (ToolErrorKind, &'static str) {
    match err {
        ClientError::Token(TokenError::AccountConfigInvalid { .. }) => {
            (ToolErrorKind::InvalidParams, "ACCOUNT_CONFIG_INVALID")
        }
        ClientError::Token(TokenError::Aborted(_)) => (ToolErrorKind::Timeout, "TOKEN_ABORTED"),
        ClientError::Token(TokenError::Store(_)) => (ToolErrorKind::Internal, "ACCOUNTS_STORE_ERROR"),
        ClientError::Token(_) => (ToolErrorKind::NotFound, "ACCOUNT_NOT_FOUND"),
        _ => match (err.kind(), err.status_code()) {
            (ErrorKind::ClientStatus, Some(401 | 403)) => (ToolErrorKind::Denied, "UPSTREAM_DENIED"),
            (ErrorKind::ClientStatus, Some(404)) => (ToolErrorKind::NotFound, "UPSTREAM_NOT_FOUND"),
            (ErrorKind::ClientStatus, Some(409)) => (ToolErrorKind::Conflict, "UPSTREAM_CONFLICT"),
            (ErrorKind::ClientStatus, _) => (ToolErrorKind::InvalidParams, "UPSTREAM_REJECTED"),
            (ErrorKind::ServerStatus, _) => (ToolErrorKind::Upstream, "UPSTREAM_ERROR"),
            (ErrorKind::Transport, _) => (ToolErrorKind::Upstream, "TRANSPORT_ERROR"),
            (ErrorKind::Serialization, _) => (ToolErrorKind::Internal, "SERIALIZATION_ERROR"),
            (ErrorKind::Request, _) => (ToolErrorKind::InvalidParams, "INVALID_REQUEST"),
            (ErrorKind::Token, _) => (ToolErrorKind::NotFound, "ACCOUNT_NOT_FOUND"),
        },
    }
}

impl From<OperationError> for ToolError {
    fn from(err: OperationError) -> Self {
        let (kind, code) = kind_for_client_error(&err.source);
        let mut tool_error = ToolError::new(kind, code, err.to_string());
        tool_error.status_code = err.source.status_code();
        if matches!(err.source, ClientError::Token(_)) {
            tool_error = tool_error
                .with_hint("Check the accounts file or pass a configured `account` name.");
        }
        tool_error
    }
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        ToolError::new(ToolErrorKind::Internal, "IO_ERROR", err.to_string())
    }
}

impl From<AccountsError> for ToolError {
    fn from(err: AccountsError) -> Self {
        let (kind, code) = match err {
            AccountsError::NoDefaultAccount | AccountsError::AccountNotFound(_) => {
                (ToolErrorKind::NotFound, "ACCOUNT_NOT_FOUND")
            }
            AccountsError::FileNotFound(_) | AccountsError::Read(_) => {
                (ToolErrorKind::Internal, "ACCOUNTS_STORE_ERROR")
            }
            AccountsError::Parse(_) | AccountsError::Invalid(_) => {
                (ToolErrorKind::InvalidParams, "ACCOUNTS_CONFIG_INVALID")
            }
        };
        ToolError::new(kind, code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HttpError;
    use reqwest::{Method, StatusCode};

    fn operation_error(source: ClientError) -> OperationError {
        OperationError {
            operation: "get pull request",
            source,
        }
    }

    #[test]
    fn not_found_status_maps_to_not_found_kind() {
        let err = ToolError::from(operation_error(ClientError::Http(HttpError::from_status(
            Method::GET,
            "https://api.example.com/pr/1",
            StatusCode::NOT_FOUND,
        ))));
        assert_eq!(err.kind, ToolErrorKind::NotFound);
        assert_eq!(err.status_code, Some(404));
        assert!(err.message.contains("get pull request failed"));
    }

    #[test]
    fn missing_default_account_carries_a_hint() {
        let err = ToolError::from(operation_error(ClientError::Token(
            TokenError::NoDefaultAccount,
        )));
        assert_eq!(err.code, "ACCOUNT_NOT_FOUND");
        assert!(err.hint.is_some());
    }

    #[test]
    fn unreadable_accounts_file_is_an_internal_failure() {
        let err = ToolError::from(operation_error(ClientError::Token(TokenError::Store(
            AccountsError::Read(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "permission denied",
            )),
        ))));
        assert_eq!(err.kind, ToolErrorKind::Internal);
        assert_eq!(err.code, "ACCOUNTS_STORE_ERROR");
        assert!(err.message.contains("permission denied"));

        let direct = ToolError::from(AccountsError::AccountNotFound("ghost".to_string()));
        assert_eq!(direct.kind, ToolErrorKind::NotFound);
    }

    #[test]
    fn server_errors_map_to_upstream() {
        let err = ToolError::from(operation_error(ClientError::Http(HttpError::from_status(
            Method::POST,
            "https://api.example.com/pr/1/merge",
            StatusCode::SERVICE_UNAVAILABLE,
        ))));
        assert_eq!(err.kind, ToolErrorKind::Upstream);
    }
}
