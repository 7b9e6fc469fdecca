use anyhow::Result;
use assume_profiles::diagnostic;
use assume_profiles::error::Error;
use assume_profiles::settings::AppConfig;
use clap::Args;
use std::path::PathBuf;

/// Flags shared by `generate` and `config set`.
#[derive(Args)]
pub struct Overrides {
    /// Long-term profile used to mint the MFA session
    #[arg(short, long)]
    profile: Option<String>,
    /// Directory holding the generated config and credentials files
    #[arg(long)]
    config_dir: Option<PathBuf>,
    /// Region written into every generated profile
    #[arg(long)]
    region: Option<String>,
    /// Lifetime of the session and role credentials, in seconds
    #[arg(short, long)]
    duration: Option<i32>,
    /// MFA device serial or ARN, instead of the first registered device
    #[arg(long)]
    mfa_device: Option<String>,
    /// Only generate profiles for these account ids
    #[arg(short, long = "account")]
    accounts: Vec<String>,
    /// Only generate profiles for these role names
    #[arg(short, long = "role")]
    roles: Vec<String>,
}

impl Overrides {
    pub fn apply(&self, settings: &mut AppConfig) -> Result<()> {
        settings.set_profile(self.profile.clone());
        settings.set_config_dir(self.config_dir.clone());
        settings.set_region(self.region.clone());
        settings.set_duration_seconds(self.duration)?;
        settings.set_mfa_device(self.mfa_device.clone());
        settings.set_accounts(self.accounts.clone());
        settings.set_roles(self.roles.clone());

        Ok(())
    }
}

#[derive(Args)]
pub struct Decode {
    /// The `Details:` value from a warning
    details: String,
}

impl Decode {
    pub fn run(&self) -> Result<()> {
        println!("{}", diagnostic::decode(&self.details)?);

        Ok(())
    }
}

pub fn prompt_mfa_code(device: &str) -> assume_profiles::error::Result<String> {
    rpassword::prompt_password(format!("MFA code for {}: ", device))
        .map_err(|e| Error::Auth(format!("could not read MFA code: {}", e)))
}
