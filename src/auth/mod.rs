//! Credential resolution: account name + product → bearer token.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::accounts::{is_usable_token, AccountsRepository, Product};
use crate::context::RequestContext;
use crate::errors::TokenError;

/// Anything that can produce a bearer token for an outbound call.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_token(&self, ctx: &RequestContext) -> Result<String, TokenError>;
}

/// Builds per-account token providers for one product.
#[derive(Clone)]
pub struct AccountAuthFactory {
    repo: Arc<dyn AccountsRepository>,
    product: Product,
}

impl AccountAuthFactory {
    pub fn new(repo: Arc<dyn AccountsRepository>, product: Product) -> Self {
        Self { repo, product }
    }

    pub fn product(&self) -> Product {
        self.product
    }

    /// An empty name selects the default account. Nothing is looked up until
    /// [`TokenProvider::get_token`] is called.
    pub fn token_provider(&self, account_name: impl Into<String>) -> AccountTokenProvider {
        AccountTokenProvider {
            repo: self.repo.clone(),
            account_name: account_name.into(),
            product: self.product,
        }
    }
}

#[derive(Clone)]
pub struct AccountTokenProvider {
    repo: Arc<dyn AccountsRepository>,
    account_name: String,
    product: Product,
}

impl AccountTokenProvider {
    pub fn account_name(&self) -> &str {
        &self.account_name
    }
}

impl fmt::Debug for AccountTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountTokenProvider")
            .field("account_name", &self.account_name)
            .field("product", &self.product)
            .finish()
    }
}

#[async_trait]
impl TokenProvider for AccountTokenProvider {
    async fn get_token(&self, ctx: &RequestContext) -> Result<String, TokenError> {
        if ctx.is_done() {
            return Err(TokenError::Aborted(
                "request context finished before token lookup".to_string(),
            ));
        }

        let account = if self.account_name.is_empty() {
            self.repo.get_default_account(ctx).await?
        } else {
            self.repo.get_account_by_name(ctx, &self.account_name).await?
        };

        let token = account
            .token_for(self.product)
            .ok_or_else(|| TokenError::AccountConfigInvalid {
                account: account.name.clone(),
                product: self.product,
                problem: "not found",
            })?;
        if !is_usable_token(token) {
            return Err(TokenError::AccountConfigInvalid {
                account: account.name.clone(),
                product: self.product,
                problem: "has an unusable token",
            });
        }

        debug!(account = %account.name, product = %self.product, "token resolved");
        Ok(token.to_string())
    }
}

/// Fixed token, for callers that already hold one.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self, _ctx: &RequestContext) -> Result<String, TokenError> {
        Ok(self.token.clone())
    }
}
