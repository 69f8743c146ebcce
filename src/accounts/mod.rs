//! Atlassian account model and the repository seam used by credential
//! resolution.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::context::RequestContext;
use crate::errors::AccountsError;

/// Product an account credential block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    Bitbucket,
    Jira,
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Product::Bitbucket => write!(f, "bitbucket"),
            Product::Jira => write!(f, "jira"),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitbucketAccount {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub workspace: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraAccount {
    #[serde(default)]
    pub token: String,
    /// Cloud instance name, e.g. "mycompany" for mycompany.atlassian.net.
    #[serde(default)]
    pub domain: String,
}

impl fmt::Debug for BitbucketAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitbucketAccount")
            .field("token", &"[REDACTED]")
            .field("workspace", &self.workspace)
            .finish()
    }
}

impl fmt::Debug for JiraAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraAccount")
            .field("token", &"[REDACTED]")
            .field("domain", &self.domain)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitbucket: Option<BitbucketAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira: Option<JiraAccount>,
}

impl Account {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: false,
            bitbucket: None,
            jira: None,
        }
    }

    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }

    pub fn with_bitbucket(mut self, token: impl Into<String>, workspace: impl Into<String>) -> Self {
        self.bitbucket = Some(BitbucketAccount {
            token: token.into(),
            workspace: workspace.into(),
        });
        self
    }

    pub fn with_jira(mut self, token: impl Into<String>, domain: impl Into<String>) -> Self {
        self.jira = Some(JiraAccount {
            token: token.into(),
            domain: domain.into(),
        });
        self
    }

    /// Token configured for `product`, if the account has that block.
    pub fn token_for(&self, product: Product) -> Option<&str> {
        match product {
            Product::Bitbucket => self.bitbucket.as_ref().map(|b| b.token.as_str()),
            Product::Jira => self.jira.as_ref().map(|j| j.token.as_str()),
        }
    }
}

static JIRA_DOMAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9-]{0,62}$").expect("jira domain regex"));

/// A Jira cloud instance name is one DNS label: "acme" in acme.atlassian.net.
pub fn is_valid_jira_domain(domain: &str) -> bool {
    JIRA_DOMAIN.is_match(domain)
}

/// Tokens end up in an `Authorization` header, so control characters
/// (a stray newline from a hand-edited file) make them unusable.
pub fn is_usable_token(token: &str) -> bool {
    !token.trim().is_empty() && !token.chars().any(char::is_control)
}

/// Read access to configured accounts.
#[async_trait]
pub trait AccountsRepository: Send + Sync {
    async fn get_default_account(&self, ctx: &RequestContext) -> Result<Account, AccountsError>;

    async fn get_account_by_name(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<Account, AccountsError>;
}
