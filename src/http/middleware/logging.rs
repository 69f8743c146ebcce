use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

use crate::errors::TransportError;
use crate::http::transport::{HttpRequest, HttpResponse, Transport};

pub struct LoggingMiddleware {
    next: Arc<dyn Transport>,
}

impl LoggingMiddleware {
    pub fn new(next: Arc<dyn Transport>) -> Self {
        Self { next }
    }
}

#[async_trait]
impl Transport for LoggingMiddleware {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let correlation_id = request.ctx.correlation_id().unwrap_or("");
        debug!(
            method = %request.method,
            url = %request.url,
            correlation_id,
            "sending HTTP request"
        );
        let started = Instant::now();

        let result = self.next.execute(request).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(response) => debug!(
                method = %request.method,
                url = %request.url,
                status = response.status.as_u16(),
                duration_ms,
                correlation_id,
                "received HTTP response"
            ),
            Err(err) => error!(
                method = %request.method,
                url = %request.url,
                error = %err,
                duration_ms,
                correlation_id,
                "HTTP request failed"
            ),
        }
        result
    }
}
