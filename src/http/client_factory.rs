use std::sync::Arc;
use std::time::Duration;

use crate::constants::network::TIMEOUT_HTTP_REQUEST_MS;
use crate::errors::ClientError;
use crate::http::middleware::{AuthMiddleware, ErrorHandlingMiddleware, LoggingMiddleware};
use crate::http::transport::{ReqwestTransport, Transport};

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub enable_auth: bool,
    pub enable_logging: bool,
    pub enable_error_handling: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(TIMEOUT_HTTP_REQUEST_MS),
            enable_auth: true,
            enable_logging: true,
            enable_error_handling: true,
        }
    }
}

impl ClientOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Builds decorated transports. Without an injected base transport each
/// client gets its own `reqwest` client honouring `options.timeout`.
#[derive(Clone, Default)]
pub struct ClientFactory {
    base: Option<Arc<dyn Transport>>,
}

impl ClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_transport(base: Arc<dyn Transport>) -> Self {
        Self { base: Some(base) }
    }

    pub fn create_client(&self, options: ClientOptions) -> Result<Arc<dyn Transport>, ClientError> {
        let base: Arc<dyn Transport> = match &self.base {
            Some(base) => base.clone(),
            None => Arc::new(
                ReqwestTransport::new(options.timeout)
                    .map_err(|err| ClientError::Network(Box::new(err)))?,
            ),
        };
        Ok(compose(base, &options))
    }
}

/// Wraps `base` so that requests pass Auth, then Logging, then
/// ErrorHandling before reaching it.
pub fn compose(base: Arc<dyn Transport>, options: &ClientOptions) -> Arc<dyn Transport> {
    let mut transport = base;
    if options.enable_error_handling {
        transport = Arc::new(ErrorHandlingMiddleware::new(transport));
    }
    if options.enable_logging {
        transport = Arc::new(LoggingMiddleware::new(transport));
    }
    if options.enable_auth {
        transport = Arc::new(AuthMiddleware::new(transport));
    }
    transport
}
