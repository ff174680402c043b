//! `postbox config init` and `postbox config show`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use postbox_core::{config, Config, RepoConfig};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write ~/.postbox/config.yaml for a repository.
    Init(InitArgs),

    /// Print the effective config (defaults filled in).
    Show,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Repository owner (user or organisation).
    #[arg(long)]
    pub owner: String,

    /// Repository name.
    #[arg(long)]
    pub repo: String,

    /// Branch the posts document lives on.
    #[arg(long, default_value = "main")]
    pub branch: String,

    /// Replace an existing config file.
    #[arg(long)]
    pub force: bool,
}

pub fn run(cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Init(args) => init(args),
        ConfigCommand::Show => show(),
    }
}

fn init(args: InitArgs) -> Result<()> {
    let path = config::config_path().context("could not determine home directory")?;
    if path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let mut repo = RepoConfig::new(args.owner, args.repo);
    repo.branch = args.branch;
    let config = Config {
        repo,
        ..Config::default()
    };
    config.validate().context("invalid repository settings")?;

    let written = config::save(&config).context("failed to write config")?;
    println!(
        "✓ Configured {}/{} ({})",
        config.repo.owner, config.repo.name, config.repo.branch
    );
    println!("  Saved to: {}", written.display());
    Ok(())
}

fn show() -> Result<()> {
    let config = config::load().context("failed to load config")?;
    let yaml = serde_yaml::to_string(&config).context("failed to encode config")?;
    print!("{yaml}");
    Ok(())
}
