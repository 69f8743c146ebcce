use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::constants::limits::ERROR_BODY_LOG_BYTES;
use crate::errors::{HttpError, TransportError};
use crate::http::transport::{HttpRequest, HttpResponse, Transport};
use crate::utils::redact::redact_text;

/// Turns transport failures and error statuses into [`HttpError`]s.
///
/// On an error status the body is read (up to a cap) for the log line and
/// then dropped; the caller only ever gets the error.
pub struct ErrorHandlingMiddleware {
    next: Arc<dyn Transport>,
}

impl ErrorHandlingMiddleware {
    pub fn new(next: Arc<dyn Transport>) -> Self {
        Self { next }
    }
}

#[async_trait]
impl Transport for ErrorHandlingMiddleware {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = match self.next.execute(request).await {
            Ok(response) => response,
            Err(TransportError::Network(cause)) => {
                return Err(HttpError::transport(
                    request.method.clone(),
                    request.url.as_str(),
                    cause,
                )
                .into());
            }
            Err(err) => return Err(err),
        };

        let status = response.status;
        if status.as_u16() < 400 {
            return Ok(response);
        }

        let error = HttpError::from_status(request.method.clone(), request.url.as_str(), status);
        let body = match response.bytes_capped(ERROR_BODY_LOG_BYTES).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => format!("<unreadable body: {}>", err),
        };
        warn!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            body = %redact_text(&body, ERROR_BODY_LOG_BYTES),
            correlation_id = request.ctx.correlation_id().unwrap_or(""),
            "HTTP error response"
        );
        Err(error.into())
    }
}
