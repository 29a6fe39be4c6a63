//! Config command implementation.

use std::path::Path;

use anyhow::{bail, Context, Result};

use bridge_core::config::Config;

use super::{ConfigAction, ConfigArgs};

/// Run the config command.
pub fn run(args: ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let config = Config::load().context("Failed to load configuration")?;
            println!("# {}", Config::config_path().display());
            print!("{}", config.to_toml()?);
        }

        ConfigAction::Path => {
            println!("{}", Config::config_path().display());
        }

        ConfigAction::Init { force } => {
            let path = Config::config_path();
            write_default(&path, force)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}

/// Write the default configuration to `path`.
fn write_default(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        );
    }

    Config::default()
        .save_to(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}
