use crate::utils::{self, Overrides};
use anyhow::Result;
use assume_profiles::aws::session::{IdentitySession, SessionOptions};
use assume_profiles::profiles::materialize::{write_profiles, ProfileMaterializer};
use assume_profiles::profiles::selection::Selection;
use assume_profiles::settings::AppConfig;
use clap::Args;
use log::{info, warn};

#[derive(Args)]
pub struct Generate {
    #[command(flatten)]
    overrides: Overrides,
    /// Current MFA code; prompted for when omitted
    #[arg(short, long)]
    mfa_code: Option<String>,
}

impl Generate {
    pub async fn run(&self, mut settings: AppConfig) -> Result<()> {
        self.overrides.apply(&mut settings)?;
        let output_dir = settings.output_dir()?;

        let options = SessionOptions {
            profile: settings.profile(),
            mfa_device: settings.mfa_device(),
            duration_seconds: settings.duration_seconds(),
            region: settings.region(),
        };
        let mfa_code = self.mfa_code.clone();
        let session = IdentitySession::login(&options, |device| match mfa_code {
            Some(code) => Ok(code),
            None => utils::prompt_mfa_code(device),
        })
        .await?;

        let selection = Selection::new(settings.accounts(), settings.roles());
        let mut materializer =
            ProfileMaterializer::new(&session, selection, settings.duration_seconds());
        let report = materializer.materialize().await?;

        write_profiles(&report.profiles, &output_dir)?;

        info!(
            "Wrote {} profiles to {}",
            report.profiles.len(),
            output_dir.display()
        );
        if !report.failures.is_empty() {
            warn!(
                "{} roles could not be assumed and were written with empty credentials",
                report.failures.len()
            );
        }

        Ok(())
    }
}
