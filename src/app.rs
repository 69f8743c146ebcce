use crate::accounts::{AccountsRepository, Product};
use crate::auth::AccountAuthFactory;
use crate::config::GatewayConfig;
use crate::errors::ToolError;
use crate::http::{ClientFactory, ClientOptions, HttpExecutor};
use crate::managers::bitbucket::{BitbucketManager, BITBUCKET_TOOLS};
use crate::managers::jira::{JiraManager, JIRA_TOOLS};
use crate::mcp::catalog::tool_names;
use crate::mcp::server::ServerInfo;
use crate::services::bitbucket::BitbucketClient;
use crate::services::jira::JiraClient;
use crate::services::tool_executor::ToolExecutor;
use crate::services::validation::Validation;
use crate::stores::AccountsStore;
use std::sync::Arc;
use tracing::info;

pub struct App {
    pub config: GatewayConfig,
    pub accounts: Arc<dyn AccountsRepository>,
    pub tool_executor: Arc<ToolExecutor>,
}

impl App {
    pub async fn initialize() -> Result<Self, ToolError> {
        Self::from_config(GatewayConfig::from_env()).await
    }

    pub async fn from_config(config: GatewayConfig) -> Result<Self, ToolError> {
        let store = AccountsStore::load(&config.accounts_file).await?;
        Self::build(config, Arc::new(store), ClientFactory::new())
    }

    /// Wires clients, managers and the executor around an existing accounts
    /// repository. Fails when a catalog tool has no handler.
    pub fn build(
        config: GatewayConfig,
        accounts: Arc<dyn AccountsRepository>,
        factory: ClientFactory,
    ) -> Result<Self, ToolError> {
        let validation = Validation::new();
        let transport = factory
            .create_client(ClientOptions::default().with_timeout(config.http_timeout))
            .map_err(|err| {
                ToolError::internal(format!("failed to build HTTP client: {}", err))
            })?;
        let executor = HttpExecutor::new(transport);

        let bitbucket = Arc::new(BitbucketManager::new(
            BitbucketClient::new(executor.clone(), config.bitbucket_base_url.clone()),
            AccountAuthFactory::new(accounts.clone(), Product::Bitbucket),
            validation.clone(),
        ));
        let jira = Arc::new(JiraManager::new(
            JiraClient::new(executor, config.jira_base_url.clone()),
            accounts.clone(),
            validation,
        ));

        let mut tool_executor = ToolExecutor::new();
        tool_executor
            .register(BITBUCKET_TOOLS, bitbucket)
            .register(JIRA_TOOLS, jira);
        tool_executor.validate_wiring(tool_names())?;
        info!(tools = tool_executor.tool_names().len(), "tool handlers registered");

        Ok(Self {
            config,
            accounts,
            tool_executor: Arc::new(tool_executor),
        })
    }

    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            name: self.config.server_name.clone(),
            version: self.config.server_version.clone(),
        }
    }
}
