mod types;

pub use types::*;

use std::path::Path;

use crate::error::{Error, Result};

/// Prefix of the environment variables that override file settings.
pub const ENV_PREFIX: &str = "SHELFWATCH_";

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
}

/// Load config from the given path, the default locations, or defaults, then
/// apply environment overrides. Callers that connect must also call
/// [`validate_config`].
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    let mut config = match custom_path {
        Some(path) => load_config(path)?,
        None => find_default_config()?,
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

fn find_default_config() -> Result<Config> {
    let default_paths = [
        "./shelfwatch.toml",
        "~/.config/shelfwatch/config.toml",
        "/etc/shelfwatch/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {}", path.display());
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Override settings from `SHELFWATCH_*` variables.
///
/// `lookup` is injected so tests do not have to touch the process environment.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

    if let Some(v) = var("HOST") {
        config.host = v;
    }
    if let Some(v) = var("TOKEN") {
        config.token = v;
    }
    if let Some(v) = var("RULES") {
        config.rules = v;
    }
    if let Some(v) = var("EXCLUDED_CODECS") {
        config.excluded_codecs = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }

    set_parsed(&var, "CONCURRENCY", &mut config.concurrency)?;
    set_parsed(&var, "SETTLE_DELAY_MS", &mut config.settle_delay_ms)?;
    set_parsed(&var, "EMBED_METADATA", &mut config.embed_metadata)?;
    set_parsed(&var, "SCAN_ON_START", &mut config.scan_on_start)?;
    set_parsed(&var, "EXIT_WHEN_DRAINED", &mut config.exit_when_drained)?;
    set_parsed(&var, "HANDSHAKE_GRACE_MS", &mut config.handshake_grace_ms)?;
    set_parsed(&var, "RECONNECT_BACKOFF_MS", &mut config.reconnect_backoff_ms)?;
    set_parsed(&var, "EMBED_DELAY_MS", &mut config.embed_delay_ms)?;
    set_parsed(&var, "RESYNC_INTERVAL_SECS", &mut config.resync_interval_secs)?;
    set_parsed(&var, "REQUEST_TIMEOUT_SECS", &mut config.request_timeout_secs)?;
    set_parsed(&var, "DRAIN_POLL_MS", &mut config.drain_poll_ms)?;

    Ok(())
}

fn set_parsed<T, F>(var: &F, name: &str, slot: &mut T) -> Result<()>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = var(name) else {
        return Ok(());
    };
    *slot = raw
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{ENV_PREFIX}{name}={raw:?}: {e}")))?;
    Ok(())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.host.trim().is_empty() {
        return Err(Error::Config("host is required".into()));
    }
    if config.token.trim().is_empty() {
        return Err(Error::Config("token is required".into()));
    }
    if config.concurrency == 0 {
        return Err(Error::Config("concurrency must be at least 1".into()));
    }

    crate::protocol::connection_url(&config.host)?;

    if crate::rules::parse_rule_table(&config.rules).is_empty() {
        tracing::warn!("Rule table is empty; no item will be re-encoded");
    }

    Ok(())
}
