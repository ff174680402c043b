pub mod admin;
pub mod config;
pub mod digest;
pub mod posts;
pub mod verify;

use anyhow::{Context, Result};
use postbox_core::{config as core_config, Config};
use postbox_store::GithubStore;

/// Load and validate the config, pointing at `postbox config init` when
/// there is nothing usable yet.
pub(crate) fn load_config() -> Result<Config> {
    let config = core_config::load().context("failed to load ~/.postbox/config.yaml")?;
    config
        .validate()
        .context("config is incomplete — run `postbox config init --owner <o> --repo <r>`")?;
    tracing::debug!(
        owner = %config.repo.owner,
        repo = %config.repo.name,
        branch = %config.repo.branch,
        "loaded config"
    );
    Ok(config)
}

pub(crate) fn github_store(config: &Config) -> Result<GithubStore> {
    GithubStore::new(config.repo.clone()).context("failed to build HTTP client")
}
