use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_DURATION_SECONDS: i32 = 3600;

/// Defaults persisted in `settings.toml`; every value can be overridden on
/// the command line.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct AppConfig {
    profile: Option<String>,
    config_dir: Option<PathBuf>,
    region: Option<String>,
    duration_seconds: Option<i32>,
    mfa_device: Option<String>,
    accounts: Option<Vec<String>>,
    roles: Option<Vec<String>>,
}

impl AppConfig {
    pub fn read_config() -> Result<Self> {
        let config_file = AppConfig::config_file()?;
        if !config_file.exists() {
            return Ok(AppConfig::default());
        }

        let config_contents = fs::read_to_string(config_file)?;
        AppConfig::from_toml(&config_contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        if let Some(duration) = config.duration_seconds {
            check_duration(duration)?;
        }

        Ok(config)
    }

    pub fn write_config(&self) -> Result<()> {
        let config_dir = AppConfig::config_dir()?;
        fs::create_dir_all(config_dir)?;

        let config_file = AppConfig::config_file()?;
        fs::write(config_file, self.to_toml()?)?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string(&self)?)
    }

    pub fn profile(&self) -> String {
        self.profile
            .clone()
            .unwrap_or_else(|| String::from(DEFAULT_PROFILE))
    }

    /// Where the generated `config` and `credentials` files go; `~/.aws`
    /// unless configured.
    pub fn output_dir(&self) -> Result<PathBuf> {
        match &self.config_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dirs::home_dir()
                .ok_or_else(|| anyhow!("could not determine home directory"))?
                .join(".aws")),
        }
    }

    pub fn region(&self) -> Option<String> {
        self.region.clone()
    }

    pub fn duration_seconds(&self) -> i32 {
        self.duration_seconds.unwrap_or(DEFAULT_DURATION_SECONDS)
    }

    pub fn mfa_device(&self) -> Option<String> {
        self.mfa_device.clone()
    }

    pub fn accounts(&self) -> Vec<String> {
        self.accounts.clone().unwrap_or_default()
    }

    pub fn roles(&self) -> Vec<String> {
        self.roles.clone().unwrap_or_default()
    }

    pub fn set_profile(&mut self, profile: Option<String>) {
        if profile.is_some() {
            self.profile = profile;
        }
    }

    pub fn set_config_dir(&mut self, config_dir: Option<PathBuf>) {
        if config_dir.is_some() {
            self.config_dir = config_dir;
        }
    }

    pub fn set_region(&mut self, region: Option<String>) {
        if region.is_some() {
            self.region = region;
        }
    }

    pub fn set_duration_seconds(&mut self, duration_seconds: Option<i32>) -> Result<()> {
        if let Some(duration) = duration_seconds {
            check_duration(duration)?;
            self.duration_seconds = Some(duration);
        }

        Ok(())
    }

    pub fn set_mfa_device(&mut self, mfa_device: Option<String>) {
        if mfa_device.is_some() {
            self.mfa_device = mfa_device;
        }
    }

    pub fn set_accounts(&mut self, accounts: Vec<String>) {
        if !accounts.is_empty() {
            self.accounts = Some(accounts);
        }
    }

    pub fn set_roles(&mut self, roles: Vec<String>) {
        if !roles.is_empty() {
            self.roles = Some(roles);
        }
    }

    fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("could not determine config directory"))?
            .join("assume-profiles");

        Ok(config_dir)
    }

    fn config_file() -> Result<PathBuf> {
        let config_file = AppConfig::config_dir()?.join("settings.toml");

        Ok(config_file)
    }
}

/// STS accepts session and role durations between 15 minutes and 36 hours.
fn check_duration(duration: i32) -> Result<()> {
    if !(900..=129600).contains(&duration) {
        return Err(anyhow!(
            "duration must be between 900 and 129600 seconds, got {}",
            duration
        ));
    }

    Ok(())
}
