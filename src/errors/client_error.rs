use serde::Serialize;
use thiserror::Error;

use super::http_error::{BoxError, HttpError, HttpErrorKind, TransportError};
use super::token_error::TokenError;

/// Coarse failure category, stable across the concrete error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Token,
    Transport,
    ClientStatus,
    ServerStatus,
    Serialization,
    Request,
}

/// Everything an outbound API call can fail with.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to get token: {0}")]
    Token(#[from] TokenError),

    #[error(transparent)]
    Http(#[from] HttpError),

    /// Raw transport failure that reached the caller unclassified, which only
    /// happens when the error-handling layer is disabled.
    #[error("HTTP request failed: {0}")]
    Network(#[source] BoxError),

    #[error("{message}: {source}")]
    Serialization {
        message: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    InvalidUrl(#[from] url::ParseError),

    /// Rejected locally before anything was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Token(_) => ErrorKind::Token,
            ClientError::Http(err) => match err.kind {
                HttpErrorKind::Transport => ErrorKind::Transport,
                HttpErrorKind::ClientStatus => ErrorKind::ClientStatus,
                HttpErrorKind::ServerStatus => ErrorKind::ServerStatus,
            },
            ClientError::Network(_) => ErrorKind::Transport,
            ClientError::Serialization { .. } => ErrorKind::Serialization,
            ClientError::InvalidUrl(_) | ClientError::InvalidRequest(_) => ErrorKind::Request,
        }
    }

    /// HTTP status of the failed exchange, if one was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Http(err) if err.status_code > 0 => Some(err.status_code),
            _ => None,
        }
    }

    pub fn marshal(source: serde_json::Error) -> Self {
        ClientError::Serialization {
            message: "failed to marshal request body",
            source,
        }
    }

    pub fn unmarshal(source: serde_json::Error) -> Self {
        ClientError::Serialization {
            message: "failed to unmarshal response",
            source,
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Network(cause) => ClientError::Network(cause),
            TransportError::Http(err) => ClientError::Http(err),
        }
    }
}

/// A product API operation that failed, e.g. "get pull request failed: ...".
#[derive(Debug, Error)]
#[error("{operation} failed: {source}")]
pub struct OperationError {
    pub operation: &'static str,
    #[source]
    pub source: ClientError,
}

impl OperationError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

pub trait OperationContext<T> {
    fn operation(self, operation: &'static str) -> Result<T, OperationError>;
}

impl<T> OperationContext<T> for Result<T, ClientError> {
    fn operation(self, operation: &'static str) -> Result<T, OperationError> {
        self.map_err(|source| OperationError { operation, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::{Method, StatusCode};
    use std::error::Error;

    #[test]
    fn operation_error_prefixes_the_operation_name() {
        let result: Result<(), ClientError> = Err(ClientError::Http(HttpError::from_status(
            Method::GET,
            "https://api.bitbucket.org/2.0/repositories/o/r/pullrequests/1",
            StatusCode::NOT_FOUND,
        )));
        let err = result.operation("get pull request").unwrap_err();
        assert!(err.to_string().starts_with("get pull request failed: "));
        assert_eq!(err.kind(), ErrorKind::ClientStatus);
        assert_eq!(err.source.status_code(), Some(404));
    }

    #[test]
    fn token_errors_keep_their_cause_in_the_chain() {
        let err = ClientError::from(TokenError::NoDefaultAccount);
        assert_eq!(err.kind(), ErrorKind::Token);
        let source = err.source().expect("token error source");
        assert!(source.downcast_ref::<TokenError>().is_some());
    }

    #[test]
    fn unclassified_network_error_counts_as_transport() {
        let err = ClientError::from(TransportError::Network("connection reset".into()));
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn invalid_url_is_passed_through_untouched() {
        let parse_err = url::Url::parse("::not a url").unwrap_err();
        let err = ClientError::from(parse_err);
        assert_eq!(err.to_string(), parse_err.to_string());
        assert_eq!(err.kind(), ErrorKind::Request);
    }
}
