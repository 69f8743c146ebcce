//! Jira Cloud REST client. The base URL carries a `{domain}` placeholder
//! filled per call from the account's cloud instance name.

pub mod models;

use reqwest::Method;
use serde_json::{Map, Value};
use url::Url;

use crate::accounts::is_valid_jira_domain;
use crate::auth::TokenProvider;
use crate::constants::network::JIRA_DOMAIN_PLACEHOLDER;
use crate::context::RequestContext;
use crate::errors::{ClientError, OperationContext, OperationError};
use crate::http::{endpoint, HttpExecutor, SendRequest};

use models::{LabelUpdateRequest, Ticket, TransitionId, TransitionRequest};

/// Stand-in label used to find where the domain lands in the base URL's host.
const DOMAIN_SENTINEL: &str = "jira-domain";

#[derive(Clone)]
pub struct JiraClient {
    executor: HttpExecutor,
    base_url: String,
}

impl JiraClient {
    pub fn new(executor: HttpExecutor, base_url: impl Into<String>) -> Self {
        Self {
            executor,
            base_url: base_url.into(),
        }
    }

    pub fn base_url_for(&self, domain: &str) -> String {
        self.base_url.replace(JIRA_DOMAIN_PLACEHOLDER, domain)
    }

    /// The token for `domain` is only ever sent to the configured host with
    /// the domain filled in; anything else is refused before a request exists.
    fn issue_url(&self, domain: &str, key: &str, rest: &[&str]) -> Result<Url, ClientError> {
        if !is_valid_jira_domain(domain) {
            return Err(ClientError::InvalidRequest(format!(
                "invalid jira domain {:?}",
                domain
            )));
        }
        let mut segments = vec!["issue", key];
        segments.extend_from_slice(rest);
        let url = endpoint(&self.base_url_for(domain), &segments)?;

        let expected = Url::parse(&self.base_url_for(DOMAIN_SENTINEL))?
            .host_str()
            .map(|host| host.replace(DOMAIN_SENTINEL, &domain.to_ascii_lowercase()));
        if url.host_str().map(str::to_string) != expected {
            return Err(ClientError::InvalidRequest(format!(
                "jira domain {:?} does not map onto the configured host",
                domain
            )));
        }
        Ok(url)
    }

    async fn authorize(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
    ) -> Result<RequestContext, ClientError> {
        let token = tokens.get_token(ctx).await?;
        Ok(ctx.with_auth_token(token))
    }

    pub async fn get_ticket(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
        domain: &str,
        key: &str,
        fields: &[String],
        expand: &[String],
    ) -> Result<Ticket, OperationError> {
        async {
            let mut url = self.issue_url(domain, key, &[])?;
            let ctx = self.authorize(ctx, tokens).await?;
            if !fields.is_empty() {
                url.query_pairs_mut().append_pair("fields", &fields.join(","));
            }
            if !expand.is_empty() {
                url.query_pairs_mut().append_pair("expand", &expand.join(","));
            }
            let mut ticket = Ticket::default();
            self.executor
                .send(&ctx, SendRequest::new(Method::GET, url).target(&mut ticket))
                .await?;
            Ok::<_, ClientError>(ticket)
        }
        .await
        .operation("get ticket")
    }

    /// Jira answers 204 with no body, so nothing is decoded.
    pub async fn manage_labels(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
        domain: &str,
        key: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<(), OperationError> {
        async {
            let url = self.issue_url(domain, key, &[])?;
            let ctx = self.authorize(ctx, tokens).await?;
            let request = LabelUpdateRequest::new(add, remove);
            self.executor
                .send(&ctx, SendRequest::new(Method::PUT, url).body(&request))
                .await
        }
        .await
        .operation("manage labels")
    }

    pub async fn transition_ticket(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
        domain: &str,
        key: &str,
        transition_id: &str,
        fields: Option<Map<String, Value>>,
        update: Option<Map<String, Value>>,
    ) -> Result<(), OperationError> {
        async {
            let url = self.issue_url(domain, key, &["transitions"])?;
            let ctx = self.authorize(ctx, tokens).await?;
            let request = TransitionRequest {
                transition: TransitionId {
                    id: transition_id.to_string(),
                },
                fields,
                update,
            };
            self.executor
                .send(&ctx, SendRequest::new(Method::POST, url).body(&request))
                .await
        }
        .await
        .operation("transition ticket")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::FakeTransport;
    use reqwest::StatusCode;

    #[test]
    fn domain_placeholder_is_substituted() {
        let client = JiraClient::new(
            HttpExecutor::new(FakeTransport::responding(StatusCode::OK, "{}")),
            "https://{domain}.atlassian.net/rest/api/3",
        );
        assert_eq!(
            client.base_url_for("acme"),
            "https://acme.atlassian.net/rest/api/3"
        );
        let url = client.issue_url("acme", "PROJ-7", &["transitions"]).expect("url");
        assert_eq!(
            url.as_str(),
            "https://acme.atlassian.net/rest/api/3/issue/PROJ-7/transitions"
        );
    }

    #[test]
    fn domains_that_would_leave_the_configured_host_are_refused() {
        let client = JiraClient::new(
            HttpExecutor::new(FakeTransport::responding(StatusCode::OK, "{}")),
            "https://{domain}.atlassian.net/rest/api/3",
        );
        for domain in ["evil.example/x?", "evil.example#", "user@evil", "acme.evil", ""] {
            let err = client.issue_url(domain, "PROJ-1", &[]).unwrap_err();
            assert!(matches!(err, ClientError::InvalidRequest(_)), "{domain}");
        }
        let url = client.issue_url("ACME", "PROJ-1", &[]).expect("url");
        assert_eq!(url.host_str(), Some("acme.atlassian.net"));
    }

    #[tokio::test]
    async fn bad_domain_fails_before_the_token_is_resolved_or_sent() {
        let fake = FakeTransport::responding(StatusCode::NO_CONTENT, "");
        let client = JiraClient::new(
            HttpExecutor::new(fake.clone()),
            "https://{domain}.atlassian.net/rest/api/3",
        );
        let err = client
            .manage_labels(
                &RequestContext::new(),
                &crate::auth::StaticTokenProvider::new("jira-tok"),
                "evil.example/x?",
                "OPS-2",
                &["a".to_string()],
                &[],
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Request);
        assert!(err.to_string().starts_with("manage labels failed: invalid request"));
        assert!(fake.requests().is_empty());
    }
}
