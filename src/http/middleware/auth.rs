use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use std::sync::Arc;

use crate::errors::TransportError;
use crate::http::transport::{HttpRequest, HttpResponse, Transport};

/// Attaches `Authorization: Bearer <token>` when the request context
/// carries a non-empty token.
pub struct AuthMiddleware {
    next: Arc<dyn Transport>,
}

impl AuthMiddleware {
    pub fn new(next: Arc<dyn Transport>) -> Self {
        Self { next }
    }
}

#[async_trait]
impl Transport for AuthMiddleware {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let token = match request.ctx.auth_token() {
            Some(token) if !token.is_empty() => token,
            _ => return self.next.execute(request).await,
        };

        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|err| TransportError::Network(Box::new(err)))?;
        value.set_sensitive(true);

        let mut authorized = request.clone();
        authorized.headers.insert(AUTHORIZATION, value);
        self.next.execute(&authorized).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{request, FakeTransport};
    use reqwest::{Method, StatusCode};

    #[tokio::test]
    async fn sets_bearer_header_on_a_copy() {
        let fake = FakeTransport::responding(StatusCode::OK, "");
        let auth = AuthMiddleware::new(fake.clone());
        let mut original = request(Method::GET, "https://api.example.com/test");
        original.ctx = original.ctx.with_auth_token("test-token");

        auth.execute(&original).await.expect("response");

        let seen = fake.requests();
        assert_eq!(
            seen[0].headers.get(AUTHORIZATION).expect("auth header"),
            "Bearer test-token"
        );
        assert!(original.headers.get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn forwards_unchanged_without_token() {
        let fake = FakeTransport::responding(StatusCode::OK, "");
        let auth = AuthMiddleware::new(fake.clone());
        let original = request(Method::GET, "https://api.example.com/test");

        auth.execute(&original).await.expect("response");
        assert!(fake.requests()[0].headers.get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn empty_token_counts_as_absent() {
        let fake = FakeTransport::responding(StatusCode::OK, "");
        let auth = AuthMiddleware::new(fake.clone());
        let mut original = request(Method::GET, "https://api.example.com/test");
        original.ctx = original.ctx.with_auth_token("");

        auth.execute(&original).await.expect("response");
        assert!(fake.requests()[0].headers.get(AUTHORIZATION).is_none());
    }
}
