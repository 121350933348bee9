use std::{
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::StorefrontConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "storefront.toml",
    "storefront.yaml",
    "storefront.yml",
    "storefront.json",
];

/// Environment variables that override `api.base_url`, highest priority first.
pub const BASE_URL_ENV_VARS: &[&str] = &["STOREFRONT_API_BASE_URL", "STOREFRONT_API_URL"];

const CREDENTIALS_FILENAME: &str = "credentials.json";

/// Override for the config directory, set via `set_config_dir()`.
static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

fn override_slot() -> MutexGuard<'static, Option<PathBuf>> {
    CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Set a custom config directory. Discovery then only looks in this directory.
pub fn set_config_dir(path: PathBuf) {
    *override_slot() = Some(path);
}

/// Clear the config directory override, restoring default discovery.
pub fn clear_config_dir() {
    *override_slot() = None;
}

fn config_dir_override() -> Option<PathBuf> {
    override_slot().clone()
}

/// Load config from the given path (any supported format), then apply env overrides.
pub fn load_config(path: &Path) -> anyhow::Result<StorefrontConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    let mut config = parse_config(&raw, path)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./storefront.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/storefront/storefront.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `StorefrontConfig::default()` (plus env overrides) when no
/// file is found or the file cannot be parsed.
pub fn discover_and_load() -> StorefrontConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    let mut config = StorefrontConfig::default();
    apply_env_overrides(&mut config);
    config
}

/// Environment wins over file values for the API base URL.
fn apply_env_overrides(config: &mut StorefrontConfig) {
    if let Some((var, value)) = BASE_URL_ENV_VARS.iter().find_map(|var| {
        std::env::var(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| (*var, v))
    }) {
        debug!(var, "api base url overridden from environment");
        config.api.base_url = value;
    }
    config.api.base_url = config.api.normalized_base_url().to_string();
}

/// Find the first config file in standard locations.
///
/// When a config dir override is set, only that directory is searched.
fn find_config_file() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        return first_existing(&dir);
    }

    if let Some(p) = CONFIG_FILENAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
    {
        return Some(p);
    }

    user_config_dir().and_then(|dir| first_existing(&dir))
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

fn user_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().join(".config").join("storefront"))
}

/// Returns the config directory: override, or `~/.config/storefront/`.
pub fn config_dir() -> Option<PathBuf> {
    config_dir_override().or_else(user_config_dir)
}

/// Path of the credentials file: explicit config value, else `<config dir>/credentials.json`.
pub fn credentials_path(config: &StorefrontConfig) -> PathBuf {
    if let Some(ref path) = config.credentials.path {
        return path.clone();
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CREDENTIALS_FILENAME)
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("storefront.toml")
}

/// Serialize `config` to TOML at the discovered (or default) config path.
///
/// Creates parent directories if needed. Returns the path written to.
pub fn save_config(config: &StorefrontConfig) -> anyhow::Result<PathBuf> {
    let path = find_or_default_config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serialize config: {e}"))?;
    std::fs::write(&path, toml_str)?;
    debug!(path = %path.display(), "saved config");
    Ok(path)
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<StorefrontConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
