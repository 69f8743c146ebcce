use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::accounts::{is_valid_jira_domain, AccountsRepository, Product};
use crate::auth::{AccountAuthFactory, AccountTokenProvider};
use crate::context::RequestContext;
use crate::errors::ToolError;
use crate::mcp::protocol::{CallToolRequest, CallToolResult};
use crate::services::jira::JiraClient;
use crate::services::tool_executor::ToolHandler;
use crate::services::validation::Validation;
use crate::utils::tool_errors::unknown_tool_error;

pub const JIRA_TOOLS: &[&str] = &[
    "jira_get_ticket",
    "jira_manage_labels",
    "jira_transition_ticket",
];

#[derive(Clone)]
pub struct JiraManager {
    client: JiraClient,
    auth: AccountAuthFactory,
    accounts: Arc<dyn AccountsRepository>,
    validation: Validation,
}

impl JiraManager {
    pub fn new(
        client: JiraClient,
        accounts: Arc<dyn AccountsRepository>,
        validation: Validation,
    ) -> Self {
        Self {
            client,
            auth: AccountAuthFactory::new(accounts.clone(), Product::Jira),
            accounts,
            validation,
        }
    }

    fn account_name(&self, args: &Value) -> Result<String, ToolError> {
        Ok(self
            .validation
            .ensure_optional_string(args, "account", "account")?
            .unwrap_or_default())
    }

    fn tokens(&self, account: &str) -> AccountTokenProvider {
        self.auth.token_provider(account)
    }

    /// The explicit `domain` argument wins; otherwise the account's own
    /// Jira domain is used. Either way it must be a bare instance name.
    async fn domain(
        &self,
        ctx: &RequestContext,
        args: &Value,
        account: &str,
    ) -> Result<String, ToolError> {
        let domain = match self
            .validation
            .ensure_optional_string(args, "domain", "domain")?
        {
            Some(domain) => domain,
            None => self.account_domain(ctx, account).await?,
        };
        if !is_valid_jira_domain(&domain) {
            return Err(ToolError::invalid_params(format!(
                "invalid jira domain {:?}: expected the instance name only",
                domain
            ))
            .with_hint("Use \"acme\" for acme.atlassian.net."));
        }
        Ok(domain)
    }

    async fn account_domain(
        &self,
        ctx: &RequestContext,
        account: &str,
    ) -> Result<String, ToolError> {
        let lookup = if account.is_empty() {
            self.accounts.get_default_account(ctx).await
        } else {
            self.accounts.get_account_by_name(ctx, account).await
        };
        let account = lookup.map_err(|err| {
            ToolError::from(err)
                .with_hint("Check the accounts file or pass a configured `account` name.")
        })?;
        account
            .jira
            .map(|jira| jira.domain)
            .filter(|domain| !domain.trim().is_empty())
            .ok_or_else(|| {
                ToolError::invalid_params(format!(
                    "account {} has no jira domain configured",
                    account.name
                ))
                .with_hint("Pass `domain` or add a jira block to the account.")
            })
    }

    pub async fn get_ticket(
        &self,
        ctx: &RequestContext,
        args: &Value,
    ) -> Result<CallToolResult, ToolError> {
        let v = &self.validation;
        let key = v.ensure_string(args, "ticket_key", "ticket key")?;
        let fields = v.ensure_string_list(args, "fields")?;
        let expand = v.ensure_string_list(args, "expand")?;
        let account = self.account_name(args)?;
        let domain = self.domain(ctx, args, &account).await?;

        let ticket = self
            .client
            .get_ticket(ctx, &self.tokens(&account), &domain, &key, &fields, &expand)
            .await?;
        let rendered = serde_json::to_string_pretty(&ticket)
            .map_err(|err| ToolError::internal(format!("failed to render response: {}", err)))?;
        Ok(CallToolResult::texts([
            format!(
                "Ticket {}: {} (Status: {})",
                ticket.key,
                ticket.fields.summary,
                ticket.status_name()
            ),
            rendered,
        ]))
    }

    pub async fn manage_labels(
        &self,
        ctx: &RequestContext,
        args: &Value,
    ) -> Result<CallToolResult, ToolError> {
        let v = &self.validation;
        let key = v.ensure_string(args, "ticket_key", "ticket key")?;
        let add = v.ensure_string_list(args, "add_labels")?;
        let remove = v.ensure_string_list(args, "remove_labels")?;
        if add.is_empty() && remove.is_empty() {
            return Err(ToolError::invalid_params(
                "either add_labels or remove_labels must be provided",
            ));
        }
        let account = self.account_name(args)?;
        let domain = self.domain(ctx, args, &account).await?;

        self.client
            .manage_labels(ctx, &self.tokens(&account), &domain, &key, &add, &remove)
            .await?;
        let mut parts = Vec::new();
        if !add.is_empty() {
            parts.push(format!("added: {}", add.join(", ")));
        }
        if !remove.is_empty() {
            parts.push(format!("removed: {}", remove.join(", ")));
        }
        Ok(CallToolResult::text(format!(
            "Updated labels on {} ({})",
            key,
            parts.join("; ")
        )))
    }

    pub async fn transition_ticket(
        &self,
        ctx: &RequestContext,
        args: &Value,
    ) -> Result<CallToolResult, ToolError> {
        let v = &self.validation;
        let key = v.ensure_string(args, "ticket_key", "ticket key")?;
        let transition_id = match args.get("transition_id") {
            Some(Value::Number(n)) => n.to_string(),
            _ => v.ensure_string(args, "transition_id", "transition ID")?,
        };
        let fields = v.ensure_optional_object(args, "fields")?;
        let update = v.ensure_optional_object(args, "update")?;
        let account = self.account_name(args)?;
        let domain = self.domain(ctx, args, &account).await?;

        self.client
            .transition_ticket(
                ctx,
                &self.tokens(&account),
                &domain,
                &key,
                &transition_id,
                fields,
                update,
            )
            .await?;
        Ok(CallToolResult::text(format!(
            "Transitioned ticket {} using transition {}",
            key, transition_id
        )))
    }
}

#[async_trait]
impl ToolHandler for JiraManager {
    async fn handle(
        &self,
        ctx: &RequestContext,
        request: CallToolRequest,
    ) -> Result<CallToolResult, ToolError> {
        let args = request.args();
        debug!(tool = %request.name, "jira tool");
        match request.name.as_str() {
            "jira_get_ticket" => self.get_ticket(ctx, args).await,
            "jira_manage_labels" => self.manage_labels(ctx, args).await,
            "jira_transition_ticket" => self.transition_ticket(ctx, args).await,
            other => Err(unknown_tool_error("jira", other, JIRA_TOOLS)),
        }
    }
}
