use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use url::Url;

use crate::context::RequestContext;
use crate::errors::ClientError;
use crate::http::transport::{HttpRequest, Transport};

const JSON: &str = "application/json";
const TEXT: &str = "text/plain";

/// A JSON request: optional body to encode, optional target to decode into.
/// A text target takes the raw response body instead of decoding it.
pub struct SendRequest<'a, B = (), T = ()> {
    method: Method,
    url: String,
    body: Option<&'a B>,
    target: Option<&'a mut T>,
    text: Option<&'a mut String>,
}

impl<'a> SendRequest<'a> {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            target: None,
            text: None,
        }
    }

    /// Asks for `text/plain` and stores the body as is (lossy UTF-8).
    /// Written only when the whole call succeeds.
    pub fn text_target(mut self, text: &'a mut String) -> Self {
        self.text = Some(text);
        self
    }
}

impl<'a, B, T> SendRequest<'a, B, T> {
    pub fn body<NB: Serialize>(self, body: &'a NB) -> SendRequest<'a, NB, T> {
        SendRequest {
            method: self.method,
            url: self.url,
            body: Some(body),
            target: self.target,
            text: self.text,
        }
    }

    /// `target` is written only when the whole call succeeds.
    pub fn target<NT: DeserializeOwned>(self, target: &'a mut NT) -> SendRequest<'a, B, NT> {
        SendRequest {
            method: self.method,
            url: self.url,
            body: self.body,
            target: Some(target),
            text: self.text,
        }
    }
}

/// Runs typed JSON requests through a transport chain.
#[derive(Clone)]
pub struct HttpExecutor {
    transport: Arc<dyn Transport>,
}

impl HttpExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn send<B, T>(
        &self,
        ctx: &RequestContext,
        request: SendRequest<'_, B, T>,
    ) -> Result<(), ClientError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let SendRequest {
            method,
            url,
            body,
            target,
            text,
        } = request;

        let payload = match body {
            Some(body) => Some(serde_json::to_vec(body).map_err(ClientError::marshal)?),
            None => None,
        };
        let url = Url::parse(&url)?;

        let mut http_request = HttpRequest::new(ctx.clone(), method, url);
        let accept = if text.is_some() { TEXT } else { JSON };
        http_request
            .headers
            .insert(ACCEPT, HeaderValue::from_static(accept));
        if let Some(payload) = payload {
            http_request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
            http_request.body = Some(payload.into());
        }

        let response = self.transport.execute(&http_request).await?;

        if let Some(text) = text {
            let bytes = response.bytes().await.map_err(ClientError::Network)?;
            *text = String::from_utf8_lossy(&bytes).into_owned();
            return Ok(());
        }
        let Some(target) = target else {
            return Ok(());
        };
        let bytes = response.bytes().await.map_err(ClientError::Network)?;
        *target = serde_json::from_slice(&bytes).map_err(ClientError::unmarshal)?;
        Ok(())
    }
}
