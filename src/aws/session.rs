use crate::aws::iam_api::{AliasApi, IamApi, SdkIam};
use crate::aws::sts_api::{SdkSts, StsApi};
use crate::aws::{Credentials, Identity};
use crate::error::{Error, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use log::info;

pub const DEFAULT_REGION: &str = "us-east-1";

/// What is needed to mint the base session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub profile: String,
    pub mfa_device: Option<String>,
    pub duration_seconds: i32,
    pub region: Option<String>,
}

/// The MFA-backed base session and the clients that sign with it.
///
/// Built once at startup and handed by reference to everything downstream.
pub struct IdentitySession {
    identity: Identity,
    base_credentials: Credentials,
    region: String,
    iam: Box<dyn IamApi>,
    sts: Box<dyn StsApi>,
    aliases: Box<dyn AliasApi>,
}

impl IdentitySession {
    pub fn new(
        identity: Identity,
        base_credentials: Credentials,
        region: String,
        iam: Box<dyn IamApi>,
        sts: Box<dyn StsApi>,
        aliases: Box<dyn AliasApi>,
    ) -> Self {
        IdentitySession {
            identity,
            base_credentials,
            region,
            iam,
            sts,
            aliases,
        }
    }

    /// Authenticates `options.profile` with an MFA session token.
    ///
    /// `mfa_code` is handed the device serial and must return the current
    /// token code.
    pub async fn login<F>(options: &SessionOptions, mfa_code: F) -> Result<Self>
    where
        F: FnOnce(&str) -> Result<String>,
    {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).profile_name(&options.profile);
        if let Some(region) = &options.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let config = with_default_region(loader.load().await);
        let region = config
            .region()
            .map(|region| region.to_string())
            .unwrap_or_else(|| String::from(DEFAULT_REGION));

        let long_term_sts = SdkSts::new(&config);
        let caller = long_term_sts.get_caller_identity().await?;
        let identity = Identity::from_arn(&caller)?;
        info!("Authenticating {} ({})", identity.user_name, identity.account_id);

        let device = match &options.mfa_device {
            Some(device) => device.clone(),
            None => SdkIam::new(&config)
                .list_mfa_devices(&identity.user_name)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    Error::Auth(format!("no MFA device registered for {}", identity.user_name))
                })?,
        };

        let code = mfa_code(&device)?;
        if code.trim().is_empty() {
            return Err(Error::Auth(String::from("an MFA code is required")));
        }

        let base_credentials = long_term_sts
            .get_session_token(&device, code.trim(), options.duration_seconds)
            .await?;

        let session_config = config
            .to_builder()
            .credentials_provider(SharedCredentialsProvider::new(
                aws_credential_types::Credentials::new(
                    base_credentials.access_key_id.clone(),
                    base_credentials.secret_access_key.clone(),
                    Some(base_credentials.session_token.clone()),
                    None,
                    "assume-profiles",
                ),
            ))
            .build();

        Ok(IdentitySession::new(
            identity,
            base_credentials,
            region,
            Box::new(SdkIam::new(&session_config)),
            Box::new(SdkSts::new(&session_config)),
            Box::new(SdkIam::new(&config)),
        ))
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn base_credentials(&self) -> &Credentials {
        &self.base_credentials
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn iam(&self) -> &dyn IamApi {
        self.iam.as_ref()
    }

    pub fn sts(&self) -> &dyn StsApi {
        self.sts.as_ref()
    }

    pub fn aliases(&self) -> &dyn AliasApi {
        self.aliases.as_ref()
    }
}

/// Falls back to `DEFAULT_REGION` when nothing configures a region; the
/// clients cannot resolve an endpoint without one.
fn with_default_region(config: SdkConfig) -> SdkConfig {
    if config.region().is_some() {
        return config;
    }

    info!("No region configured, using {}", DEFAULT_REGION);
    config
        .to_builder()
        .region(Region::new(DEFAULT_REGION))
        .build()
}
