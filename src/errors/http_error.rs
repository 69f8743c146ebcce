use reqwest::{Method, StatusCode};
use serde::Serialize;
use std::error::Error;
use std::fmt;
use thiserror::Error as ThisError;

pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpErrorKind {
    /// No response was obtained.
    Transport,
    /// 4xx response.
    ClientStatus,
    /// 5xx response.
    ServerStatus,
}

/// An outbound HTTP exchange that failed, classified at the point of failure.
#[derive(Debug)]
pub struct HttpError {
    pub kind: HttpErrorKind,
    pub method: Method,
    pub url: String,
    /// Zero for transport failures.
    pub status_code: u16,
    pub message: String,
    pub cause: Option<BoxError>,
}

impl HttpError {
    pub fn transport(method: Method, url: impl Into<String>, cause: BoxError) -> Self {
        Self {
            kind: HttpErrorKind::Transport,
            method,
            url: url.into(),
            status_code: 0,
            message: "HTTP transport error".to_string(),
            cause: Some(cause),
        }
    }

    /// Classifies an error status. Callers only pass statuses >= 400.
    pub fn from_status(method: Method, url: impl Into<String>, status: StatusCode) -> Self {
        let (kind, label) = if status.is_server_error() {
            (HttpErrorKind::ServerStatus, "server")
        } else {
            (HttpErrorKind::ClientStatus, "client")
        };
        let message = match status.canonical_reason() {
            Some(reason) => format!("HTTP {} error ({} {})", label, status.as_u16(), reason),
            None => format!("HTTP {} error ({})", label, status.as_u16()),
        };
        Self {
            kind,
            method,
            url: url.into(),
            status_code: status.as_u16(),
            message,
            cause: None,
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.message, cause),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Error for HttpError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn Error + 'static))
    }
}

/// Error type flowing through the transport chain. The base transport only
/// produces `Network`; the error-handling layer turns everything into `Http`.
#[derive(Debug, ThisError)]
pub enum TransportError {
    #[error("{0}")]
    Network(#[source] BoxError),

    #[error(transparent)]
    Http(#[from] HttpError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_appends_the_cause_when_present() {
        let err = HttpError::transport(
            Method::GET,
            "https://api.example.com/test",
            "connection timeout".into(),
        );
        assert_eq!(err.to_string(), "HTTP transport error: connection timeout");
        assert!(err.source().is_some());
    }

    #[test]
    fn display_is_just_the_message_without_cause() {
        let err = HttpError::from_status(
            Method::GET,
            "https://api.example.com/test",
            StatusCode::NOT_FOUND,
        );
        assert_eq!(err.to_string(), "HTTP client error (404 Not Found)");
        assert!(err.source().is_none());
    }

    #[test]
    fn from_status_splits_client_and_server_ranges() {
        let client = HttpError::from_status(Method::POST, "u", StatusCode::BAD_REQUEST);
        let server = HttpError::from_status(Method::POST, "u", StatusCode::BAD_GATEWAY);
        assert_eq!(client.kind, HttpErrorKind::ClientStatus);
        assert_eq!(server.kind, HttpErrorKind::ServerStatus);
        assert_eq!(server.status_code, 502);
        assert!(server.message.contains("server error"));
    }
}
