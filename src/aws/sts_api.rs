use crate::aws::Credentials;
use crate::error::{Error, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sts::error::DisplayErrorContext;
use aws_sdk_sts::Client;
use log::info;

#[async_trait]
pub trait StsApi: Send + Sync {
    async fn get_session_token(
        &self,
        serial_number: &str,
        token_code: &str,
        duration_seconds: i32,
    ) -> Result<Credentials>;
    async fn get_caller_identity(&self) -> Result<String>;
    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
        duration_seconds: i32,
    ) -> Result<Credentials>;
}

pub struct SdkSts {
    client: Client,
}

impl SdkSts {
    pub fn new(config: &SdkConfig) -> Self {
        SdkSts {
            client: Client::new(config),
        }
    }
}

fn convert(credentials: Option<&aws_sdk_sts::types::Credentials>) -> Option<Credentials> {
    credentials.map(|credentials| {
        Credentials::new(
            credentials.access_key_id(),
            credentials.secret_access_key(),
            credentials.session_token(),
        )
    })
}

#[async_trait]
impl StsApi for SdkSts {
    async fn get_session_token(
        &self,
        serial_number: &str,
        token_code: &str,
        duration_seconds: i32,
    ) -> Result<Credentials> {
        info!("Calling STS GetSessionToken with {}", serial_number);
        let response = self
            .client
            .get_session_token()
            .serial_number(serial_number)
            .token_code(token_code)
            .duration_seconds(duration_seconds)
            .send()
            .await
            .map_err(|e| Error::Auth(DisplayErrorContext(&e).to_string()))?;

        convert(response.credentials())
            .ok_or_else(|| Error::Auth(String::from("STS returned no session credentials")))
    }

    async fn get_caller_identity(&self) -> Result<String> {
        info!("Calling STS GetCallerIdentity");
        let response = self
            .client
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| Error::Auth(DisplayErrorContext(&e).to_string()))?;

        response
            .arn()
            .map(String::from)
            .ok_or_else(|| Error::Auth(String::from("STS returned no caller arn")))
    }

    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
        duration_seconds: i32,
    ) -> Result<Credentials> {
        info!("Calling STS AssumeRole for {}", role_arn);
        let response = self
            .client
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .duration_seconds(duration_seconds)
            .send()
            .await
            .map_err(|e| Error::PermissionDenied {
                arn: role_arn.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        convert(response.credentials()).ok_or_else(|| Error::PermissionDenied {
            arn: role_arn.to_string(),
            message: String::from("STS returned no credentials"),
        })
    }
}
