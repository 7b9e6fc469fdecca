mod config;
mod generate;
mod utils;

use crate::config::Config;
use crate::generate::Generate;
use anyhow::Result;
use assume_profiles::logging;
use assume_profiles::settings::AppConfig;
use clap::{Parser, Subcommand};
use log::LevelFilter;

#[derive(Parser)]
#[command(version, about = "Materialize a profile for every role your IAM user may assume")]
struct Opts {
    #[command(subcommand)]
    sub_command: SubCommand,
}

#[derive(Subcommand)]
enum SubCommand {
    /// Manage saved defaults
    Config(Config),
    /// Discover roles and write the config and credentials files
    Generate(Generate),
    /// Expand the details blob printed with a failed-role warning
    Decode(utils::Decode),
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt: Opts = Opts::parse();
    let mut settings = AppConfig::read_config()?;

    logging::init(LevelFilter::Info)?;

    match opt.sub_command {
        SubCommand::Config(val) => val.run(&mut settings)?,
        SubCommand::Generate(val) => val.run(settings).await?,
        SubCommand::Decode(val) => val.run()?,
    }

    Ok(())
}
