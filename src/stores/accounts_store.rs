use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::accounts::{is_usable_token, is_valid_jira_domain, Account, AccountsRepository};
use crate::context::RequestContext;
use crate::errors::AccountsError;

#[derive(Debug, Deserialize)]
struct AccountsFile {
    #[serde(default)]
    accounts: Vec<Account>,
}

struct Snapshot {
    accounts: Arc<Vec<Account>>,
    /// mtime of the file the snapshot was read from.
    modified: Option<SystemTime>,
}

/// Accounts held in memory, optionally backed by a JSON file.
///
/// File-backed stores are validated on every load. Lookups re-read the file
/// when its modification time changes, so edits apply without a restart; a
/// failed [`reload`] keeps the previous snapshot.
///
/// [`reload`]: AccountsStore::reload
pub struct AccountsStore {
    file_path: Option<PathBuf>,
    snapshot: RwLock<Snapshot>,
}

impl AccountsStore {
    /// In-memory store. No validation: lookups of the default account pick
    /// the first flagged entry.
    pub fn from_accounts(accounts: Vec<Account>) -> Self {
        Self {
            file_path: None,
            snapshot: RwLock::new(Snapshot {
                accounts: Arc::new(accounts),
                modified: None,
            }),
        }
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AccountsError> {
        let path = path.as_ref().to_path_buf();
        let modified = modified_at(&path).await;
        let accounts = read_accounts_file(&path).await?;
        info!(path = %path.display(), accounts = accounts.len(), "accounts loaded");
        Ok(Self {
            file_path: Some(path),
            snapshot: RwLock::new(Snapshot {
                accounts: Arc::new(accounts),
                modified,
            }),
        })
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Re-reads the backing file. In-memory stores have nothing to reload.
    pub async fn reload(&self) -> Result<(), AccountsError> {
        let Some(path) = self.file_path.as_ref() else {
            return Ok(());
        };
        let modified = modified_at(path).await;
        let accounts = read_accounts_file(path).await?;
        debug!(path = %path.display(), accounts = accounts.len(), "accounts reloaded");
        *self.snapshot.write().await = Snapshot {
            accounts: Arc::new(accounts),
            modified,
        };
        Ok(())
    }

    pub async fn accounts(&self) -> Arc<Vec<Account>> {
        self.current().await
    }

    /// Current accounts, reloading first if the backing file changed.
    async fn current(&self) -> Arc<Vec<Account>> {
        if let Some(path) = self.file_path.as_ref() {
            let modified = modified_at(path).await;
            let stale = modified.is_some() && self.snapshot.read().await.modified != modified;
            if stale {
                if let Err(err) = self.reload().await {
                    warn!(path = %path.display(), error = %err, "accounts file changed but could not be reloaded; keeping previous accounts");
                }
            }
        }
        self.snapshot.read().await.accounts.clone()
    }
}

#[async_trait]
impl AccountsRepository for AccountsStore {
    async fn get_default_account(&self, _ctx: &RequestContext) -> Result<Account, AccountsError> {
        self.current()
            .await
            .iter()
            .find(|account| account.default)
            .cloned()
            .ok_or(AccountsError::NoDefaultAccount)
    }

    async fn get_account_by_name(
        &self,
        _ctx: &RequestContext,
        name: &str,
    ) -> Result<Account, AccountsError> {
        self.current()
            .await
            .iter()
            .find(|account| account.name == name)
            .cloned()
            .ok_or_else(|| AccountsError::AccountNotFound(name.to_string()))
    }
}

async fn modified_at(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

async fn read_accounts_file(path: &Path) -> Result<Vec<Account>, AccountsError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(AccountsError::FileNotFound(path.to_path_buf()));
    }
    let raw = tokio::fs::read_to_string(path).await?;
    parse_accounts(&raw)
}

pub fn parse_accounts(raw: &str) -> Result<Vec<Account>, AccountsError> {
    let parsed: AccountsFile = serde_json::from_str(raw)?;
    validate_accounts(&parsed.accounts)?;
    Ok(parsed.accounts)
}

pub fn validate_accounts(accounts: &[Account]) -> Result<(), AccountsError> {
    if accounts.is_empty() {
        return Err(AccountsError::invalid("no accounts configured"));
    }
    let mut names = HashSet::new();
    let mut has_default = false;
    for account in accounts {
        if account.name.trim().is_empty() {
            return Err(AccountsError::invalid("account missing name"));
        }
        if !names.insert(account.name.as_str()) {
            return Err(AccountsError::invalid(format!(
                "duplicate account name: {}",
                account.name
            )));
        }
        if account.bitbucket.is_none() && account.jira.is_none() {
            return Err(AccountsError::invalid(format!(
                "account {} must have at least one service configured",
                account.name
            )));
        }
        if let Some(bitbucket) = &account.bitbucket {
            if bitbucket.token.trim().is_empty() {
                return Err(AccountsError::invalid(format!(
                    "account {} is missing Bitbucket token",
                    account.name
                )));
            }
            if !is_usable_token(&bitbucket.token) {
                return Err(AccountsError::invalid(format!(
                    "account {} has a Bitbucket token with control characters",
                    account.name
                )));
            }
            if bitbucket.workspace.trim().is_empty() {
                return Err(AccountsError::invalid(format!(
                    "account {} is missing Bitbucket workspace",
                    account.name
                )));
            }
        }
        if let Some(jira) = &account.jira {
            if jira.token.trim().is_empty() {
                return Err(AccountsError::invalid(format!(
                    "account {} is missing Jira token",
                    account.name
                )));
            }
            if !is_usable_token(&jira.token) {
                return Err(AccountsError::invalid(format!(
                    "account {} has a Jira token with control characters",
                    account.name
                )));
            }
            if jira.domain.trim().is_empty() {
                return Err(AccountsError::invalid(format!(
                    "account {} is missing Jira domain",
                    account.name
                )));
            }
            if !is_valid_jira_domain(&jira.domain) {
                return Err(AccountsError::invalid(format!(
                    "account {} has an invalid Jira domain {:?}: expected the instance name only, e.g. \"acme\" for acme.atlassian.net",
                    account.name, jira.domain
                )));
            }
        }
        if account.default {
            if has_default {
                return Err(AccountsError::invalid("multiple default accounts defined"));
            }
            has_default = true;
        }
    }
    if !has_default {
        return Err(AccountsError::invalid("no default account specified"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    const VALID: &str = r#"{
        "accounts": [
            {"name": "work", "default": true,
             "bitbucket": {"token": "bb-work", "workspace": "acme"},
             "jira": {"token": "jira-work", "domain": "acme"}},
            {"name": "personal",
             "bitbucket": {"token": "bb-personal", "workspace": "me"}}
        ]
    }"#;

    fn write_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write accounts");
        file
    }

    #[test]
    fn accepts_a_well_formed_file() {
        let accounts = parse_accounts(VALID).expect("valid accounts");
        assert_eq!(accounts.len(), 2);
        assert!(accounts[0].default);
    }

    #[test]
    fn rejects_multiple_defaults() {
        let raw = r#"{"accounts": [
            {"name": "a", "default": true, "jira": {"token": "t", "domain": "d"}},
            {"name": "b", "default": true, "jira": {"token": "t", "domain": "d"}}
        ]}"#;
        let err = parse_accounts(raw).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid accounts configuration: multiple default accounts defined"
        );
    }

    #[test]
    fn rejects_duplicate_names_and_empty_product_blocks() {
        let duplicate = r#"{"accounts": [
            {"name": "a", "default": true, "jira": {"token": "t", "domain": "d"}},
            {"name": "a", "jira": {"token": "t", "domain": "d"}}
        ]}"#;
        assert!(parse_accounts(duplicate)
            .unwrap_err()
            .to_string()
            .contains("duplicate account name: a"));

        let no_service = r#"{"accounts": [{"name": "a", "default": true}]}"#;
        assert!(parse_accounts(no_service)
            .unwrap_err()
            .to_string()
            .contains("at least one service"));

        let no_workspace =
            r#"{"accounts": [{"name": "a", "default": true, "bitbucket": {"token": "t"}}]}"#;
        assert!(parse_accounts(no_workspace)
            .unwrap_err()
            .to_string()
            .contains("missing Bitbucket workspace"));
    }

    #[test]
    fn rejects_empty_list_and_missing_default() {
        assert!(parse_accounts(r#"{"accounts": []}"#).is_err());
        let no_default = r#"{"accounts": [{"name": "a", "jira": {"token": "t", "domain": "d"}}]}"#;
        assert!(parse_accounts(no_default)
            .unwrap_err()
            .to_string()
            .contains("no default account specified"));
    }

    #[tokio::test]
    async fn in_memory_store_returns_first_flagged_default() {
        let store = AccountsStore::from_accounts(vec![
            Account::new("first").as_default().with_jira("t1", "d1"),
            Account::new("second").as_default().with_jira("t2", "d2"),
        ]);
        let ctx = RequestContext::new();
        let account = store.get_default_account(&ctx).await.expect("default");
        assert_eq!(account.name, "first");
    }

    #[tokio::test]
    async fn lookup_by_unknown_name_fails() {
        let store = AccountsStore::from_accounts(vec![Account::new("work").as_default()]);
        let err = store
            .get_account_by_name(&RequestContext::new(), "ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountsError::AccountNotFound(name) if name == "ghost"));
    }

    #[tokio::test]
    async fn reload_picks_up_file_changes() {
        let file = write_file(VALID);
        let store = AccountsStore::load(file.path()).await.expect("load");
        let ctx = RequestContext::new();
        assert!(store.get_account_by_name(&ctx, "personal").await.is_ok());

        std::fs::write(
            file.path(),
            r#"{"accounts": [{"name": "solo", "default": true,
                "bitbucket": {"token": "bb", "workspace": "w"}}]}"#,
        )
        .expect("rewrite accounts");
        store.reload().await.expect("reload");

        assert!(store.get_account_by_name(&ctx, "personal").await.is_err());
        let default = store.get_default_account(&ctx).await.expect("default");
        assert_eq!(default.name, "solo");
    }

    fn touch_forward(path: &Path) {
        let file = std::fs::OpenOptions::new()
            .write(true)
            .open(path)
            .expect("open accounts");
        file.set_modified(SystemTime::now() + Duration::from_secs(5))
            .expect("set mtime");
    }

    #[tokio::test]
    async fn lookups_see_edits_without_an_explicit_reload() {
        let file = write_file(VALID);
        let store = AccountsStore::load(file.path()).await.expect("load");
        let ctx = RequestContext::new();
        assert_eq!(
            store.get_default_account(&ctx).await.expect("default").name,
            "work"
        );

        std::fs::write(
            file.path(),
            r#"{"accounts": [{"name": "rotated", "default": true,
                "bitbucket": {"token": "bb-new", "workspace": "w"}}]}"#,
        )
        .expect("rewrite accounts");
        touch_forward(file.path());

        let default = store.get_default_account(&ctx).await.expect("default");
        assert_eq!(default.name, "rotated");
        assert!(store.get_account_by_name(&ctx, "work").await.is_err());
    }

    #[tokio::test]
    async fn broken_edit_keeps_serving_the_last_good_accounts() {
        let file = write_file(VALID);
        let store = AccountsStore::load(file.path()).await.expect("load");
        std::fs::write(file.path(), "{half written").expect("corrupt file");
        touch_forward(file.path());

        let ctx = RequestContext::new();
        assert_eq!(
            store.get_account_by_name(&ctx, "personal").await.expect("personal").name,
            "personal"
        );
    }

    #[test]
    fn rejects_tokens_that_cannot_be_sent_as_headers() {
        let raw = r#"{"accounts": [{"name": "a", "default": true,
            "bitbucket": {"token": "bb-tok\n", "workspace": "w"}}]}"#;
        assert!(parse_accounts(raw)
            .unwrap_err()
            .to_string()
            .contains("account a has a Bitbucket token with control characters"));
    }

    #[test]
    fn rejects_jira_domains_that_are_not_a_single_label() {
        let raw = r#"{"accounts": [{"name": "a", "default": true,
            "jira": {"token": "t", "domain": "acme.atlassian.net"}}]}"#;
        assert!(parse_accounts(raw)
            .unwrap_err()
            .to_string()
            .contains("invalid Jira domain"));
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_accounts() {
        let file = write_file(VALID);
        let store = AccountsStore::load(file.path()).await.expect("load");
        std::fs::write(file.path(), "{not json").expect("corrupt file");

        assert!(matches!(store.reload().await, Err(AccountsError::Parse(_))));
        assert_eq!(store.accounts().await.len(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_reported_with_its_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.json");
        let err = AccountsStore::load(&path).await.err().expect("must fail");
        assert!(matches!(err, AccountsError::FileNotFound(p) if p == path));
    }
}
