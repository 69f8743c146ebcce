use tracing_subscriber::EnvFilter;

use crate::constants::env as env_keys;

const DEFAULT_LEVEL: &str = "info";

fn level_from_env() -> String {
    std::env::var(env_keys::LOG_LEVEL)
        .ok()
        .map(|level| level.trim().to_lowercase())
        .filter(|level| matches!(level.as_str(), "error" | "warn" | "info" | "debug" | "trace"))
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

/// `RUST_LOG` wins; otherwise `LOG_LEVEL`, then `info`.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_from_env()))
}

/// Installs the global subscriber. Logs go to stderr: stdout carries the
/// protocol stream. Safe to call more than once.
pub fn init() {
    let json = std::env::var(env_keys::LOG_FORMAT)
        .map(|format| format.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
