use crate::utils::Overrides;
use anyhow::Result;
use assume_profiles::settings::AppConfig;
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct Config {
    #[command(subcommand)]
    sub_command: ConfigSubCommand,
}

#[derive(Subcommand)]
enum ConfigSubCommand {
    /// Persist the given values as defaults
    Set(ConfigSet),
    /// Print the saved defaults
    Show,
}

#[derive(Args)]
struct ConfigSet {
    #[command(flatten)]
    overrides: Overrides,
}

impl Config {
    pub fn run(&self, settings: &mut AppConfig) -> Result<()> {
        match &self.sub_command {
            ConfigSubCommand::Set(val) => val.run(settings),
            ConfigSubCommand::Show => {
                print!("{}", settings.to_toml()?);
                Ok(())
            }
        }
    }
}

impl ConfigSet {
    fn run(&self, settings: &mut AppConfig) -> Result<()> {
        self.overrides.apply(settings)?;
        settings.write_config()?;

        Ok(())
    }
}
