//! Configuration loading for the storefront client.
//!
//! Config files: `storefront.toml`, `storefront.yaml`, or `storefront.json`.
//! Searched in `./` then `~/.config/storefront/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values, and the
//! `STOREFRONT_API_BASE_URL` / `STOREFRONT_API_URL` overrides.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{
        clear_config_dir, config_dir, credentials_path, discover_and_load,
        find_or_default_config_path, load_config, save_config, set_config_dir,
    },
    schema::{ApiConfig, CredentialsConfig, StorefrontConfig},
};
