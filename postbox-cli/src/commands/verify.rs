//! `postbox verify --token <token>`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use postbox_session::verify_write_token;
use postbox_store::AccessToken;

use super::{github_store, load_config};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Personal access token to check.
    #[arg(long, env = "POSTBOX_TOKEN", hide_env_values = true)]
    pub token: String,
}

impl VerifyArgs {
    pub async fn run(self) -> Result<()> {
        let config = load_config()?;
        let store = github_store(&config)?;
        let identity = verify_write_token(&store, &AccessToken::new(self.token))
            .await
            .with_context(|| {
                format!(
                    "token cannot publish to {}/{}",
                    config.repo.owner, config.repo.name
                )
            })?;
        println!(
            "{} token for {} can publish to {}/{}",
            "✓".green(),
            identity.login.bold(),
            config.repo.owner,
            config.repo.name
        );
        Ok(())
    }
}
