use std::env;
use std::path::{Path, PathBuf};

use crate::constants::env as env_keys;
use crate::constants::paths::{ACCOUNTS_FILE_NAME, CONFIG_DIR_NAME};

fn normalize_env_path(value: Option<String>) -> Option<PathBuf> {
    let raw = value?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lowered = trimmed.to_lowercase();
    if lowered == "undefined" || lowered == "null" {
        return None;
    }
    Some(expand_home_path(trimmed))
}

fn resolve_home_dir() -> Option<PathBuf> {
    env::var("HOME").ok().map(PathBuf::from)
}

fn resolve_xdg_config_dir() -> Option<PathBuf> {
    if let Some(path) = normalize_env_path(env::var("XDG_CONFIG_HOME").ok()) {
        return Some(path);
    }
    resolve_home_dir().map(|home| home.join(".config"))
}

pub fn expand_home_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let Some(raw) = path.to_str() else {
        return path.to_path_buf();
    };
    match (raw, resolve_home_dir()) {
        ("~", Some(home)) => home,
        (_, Some(home)) if raw.starts_with("~/") => home.join(&raw[2..]),
        _ => path.to_path_buf(),
    }
}

/// Accounts file location: the env override, then the user config dir when
/// the file exists there, then `./accounts.json`.
pub fn resolve_accounts_path() -> PathBuf {
    if let Some(path) = normalize_env_path(env::var(env_keys::ACCOUNTS_FILE).ok()) {
        return path;
    }
    if let Some(dir) = resolve_xdg_config_dir() {
        let candidate = dir.join(CONFIG_DIR_NAME).join(ACCOUNTS_FILE_NAME);
        if candidate.exists() {
            return candidate;
        }
    }
    PathBuf::from(ACCOUNTS_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_home_path_leaves_plain_paths_alone() {
        assert_eq!(
            expand_home_path("/etc/atlasgate/accounts.json"),
            PathBuf::from("/etc/atlasgate/accounts.json")
        );
        assert_eq!(expand_home_path("accounts.json"), PathBuf::from("accounts.json"));
    }

    #[test]
    fn normalize_env_path_ignores_placeholder_values() {
        assert!(normalize_env_path(Some("  ".to_string())).is_none());
        assert!(normalize_env_path(Some("null".to_string())).is_none());
        assert!(normalize_env_path(None).is_none());
        assert_eq!(
            normalize_env_path(Some(" /tmp/a.json ".to_string())),
            Some(PathBuf::from("/tmp/a.json"))
        );
    }
}
