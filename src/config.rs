use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::env as env_keys;
use crate::constants::network::{BITBUCKET_BASE_URL, JIRA_BASE_URL, TIMEOUT_HTTP_REQUEST_MS};
use crate::constants::protocol::{SERVER_NAME, SERVER_VERSION};
use crate::utils::paths::resolve_accounts_path;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub accounts_file: PathBuf,
    pub bitbucket_base_url: String,
    /// May contain `{domain}`.
    pub jira_base_url: String,
    pub http_timeout: Duration,
    pub server_name: String,
    pub server_version: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            accounts_file: resolve_accounts_path(),
            bitbucket_base_url: BITBUCKET_BASE_URL.to_string(),
            jira_base_url: JIRA_BASE_URL.to_string(),
            http_timeout: Duration::from_millis(TIMEOUT_HTTP_REQUEST_MS),
            server_name: SERVER_NAME.to_string(),
            server_version: SERVER_VERSION.to_string(),
        }
    }
}

fn read_env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_positive_int(key: &str) -> Option<u64> {
    read_env_string(key)
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            accounts_file: defaults.accounts_file,
            bitbucket_base_url: read_env_string(env_keys::BITBUCKET_BASE_URL)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.bitbucket_base_url),
            jira_base_url: read_env_string(env_keys::JIRA_BASE_URL)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.jira_base_url),
            http_timeout: read_positive_int(env_keys::HTTP_TIMEOUT_MS)
                .map(Duration::from_millis)
                .unwrap_or(defaults.http_timeout),
            server_name: read_env_string(env_keys::SERVER_NAME).unwrap_or(defaults.server_name),
            server_version: read_env_string(env_keys::SERVER_VERSION)
                .unwrap_or(defaults.server_version),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn env_overrides_and_fallbacks() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        env::set_var(env_keys::HTTP_TIMEOUT_MS, "not-a-number");
        env::set_var(env_keys::BITBUCKET_BASE_URL, "http://127.0.0.1:9000/2.0/");
        env::set_var(env_keys::SERVER_NAME, "  ");

        let config = GatewayConfig::from_env();
        assert_eq!(
            config.http_timeout,
            Duration::from_millis(TIMEOUT_HTTP_REQUEST_MS)
        );
        assert_eq!(config.bitbucket_base_url, "http://127.0.0.1:9000/2.0");
        assert_eq!(config.server_name, SERVER_NAME);
        assert_eq!(config.jira_base_url, JIRA_BASE_URL);

        env::set_var(env_keys::HTTP_TIMEOUT_MS, "1500");
        assert_eq!(
            GatewayConfig::from_env().http_timeout,
            Duration::from_millis(1500)
        );

        env::remove_var(env_keys::HTTP_TIMEOUT_MS);
        env::remove_var(env_keys::BITBUCKET_BASE_URL);
        env::remove_var(env_keys::SERVER_NAME);
    }
}
