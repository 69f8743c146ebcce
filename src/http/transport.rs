use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::constants::network::USER_AGENT;
use crate::context::RequestContext;
use crate::errors::{BoxError, TransportError};

/// One outbound HTTP request, bound to the context it runs under.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub ctx: RequestContext,
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(ctx: RequestContext, method: Method, url: Url) -> Self {
        Self {
            ctx,
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Streamed response body. Dropping it releases the underlying connection.
#[async_trait]
pub trait ResponseBody: Send {
    /// Next chunk, or `None` once the body is exhausted.
    async fn chunk(&mut self) -> Result<Option<Bytes>, BoxError>;
}

#[async_trait]
impl ResponseBody for Bytes {
    async fn chunk(&mut self) -> Result<Option<Bytes>, BoxError> {
        if self.is_empty() {
            return Ok(None);
        }
        Ok(Some(std::mem::take(self)))
    }
}

struct ReqwestBody(reqwest::Response);

#[async_trait]
impl ResponseBody for ReqwestBody {
    async fn chunk(&mut self) -> Result<Option<Bytes>, BoxError> {
        self.0.chunk().await.map_err(|err| Box::new(err) as BoxError)
    }
}

pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Box<dyn ResponseBody>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Box<dyn ResponseBody>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn from_bytes(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self::new(status, HeaderMap::new(), Box::new(body.into()))
    }

    /// Reads the whole body, consuming the response.
    pub async fn bytes(mut self) -> Result<Bytes, BoxError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.body.chunk().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }

    /// Reads at most `limit` bytes and drops the rest of the body unread.
    pub async fn bytes_capped(mut self, limit: usize) -> Result<Bytes, BoxError> {
        let mut buf = BytesMut::new();
        while buf.len() < limit {
            match self.body.chunk().await? {
                Some(chunk) => {
                    let take = chunk.len().min(limit - buf.len());
                    buf.extend_from_slice(&chunk[..take]);
                }
                None => break,
            }
        }
        Ok(buf.freeze())
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// A single HTTP round trip. Implementations must not mutate the request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Base transport on top of a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = tokio::select! {
            result = builder.send() => {
                result.map_err(|err| TransportError::Network(Box::new(err)))?
            }
            reason = request.ctx.done() => {
                return Err(TransportError::Network(Box::new(reason)));
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        Ok(HttpResponse::new(
            status,
            headers,
            Box::new(ReqwestBody(response)),
        ))
    }
}
