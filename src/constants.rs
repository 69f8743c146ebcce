pub mod env {
    pub const ACCOUNTS_FILE: &str = "ATLASGATE_ACCOUNTS_FILE";
    pub const BITBUCKET_BASE_URL: &str = "ATLASGATE_BITBUCKET_BASE_URL";
    pub const JIRA_BASE_URL: &str = "ATLASGATE_JIRA_BASE_URL";
    pub const HTTP_TIMEOUT_MS: &str = "ATLASGATE_HTTP_TIMEOUT_MS";
    pub const SERVER_NAME: &str = "ATLASGATE_SERVER_NAME";
    pub const SERVER_VERSION: &str = "ATLASGATE_SERVER_VERSION";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}

pub mod network {
    pub const TIMEOUT_HTTP_REQUEST_MS: u64 = 30_000;
    pub const BITBUCKET_BASE_URL: &str = "https://api.bitbucket.org/2.0";
    /// `{domain}` is replaced with the account's Jira domain.
    pub const JIRA_BASE_URL: &str = "https://{domain}.atlassian.net/rest/api/3";
    pub const JIRA_DOMAIN_PLACEHOLDER: &str = "{domain}";
    pub const USER_AGENT: &str = concat!("atlasgate/", env!("CARGO_PKG_VERSION"));
}

pub mod paths {
    pub const CONFIG_DIR_NAME: &str = "atlasgate";
    pub const ACCOUNTS_FILE_NAME: &str = "accounts.json";
}

pub mod limits {
    /// Bytes of an error response body kept for the warn log.
    pub const ERROR_BODY_LOG_BYTES: usize = 2_048;
    /// Bytes of a single logged argument string.
    pub const LOG_ARGUMENT_STRING: usize = 512;
    pub const MAX_SCHEMA_ERRORS: usize = 10;
}

pub mod protocol {
    pub const JSONRPC_VERSION: &str = "2.0";
    pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";
    pub const SERVER_NAME: &str = "atlasgate";
    pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const CORRELATION_META_KEY: &str = "correlationId";
}

pub mod bitbucket {
    pub const MERGE_STRATEGIES: &[&str] = &["merge_commit", "squash", "fast_forward"];
}
