use crate::aws::Credentials;
use crate::error::{Error, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_iam::error::DisplayErrorContext;
use aws_sdk_iam::Client;
use log::info;

/// One entry of a managed policy's version listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyVersion {
    pub version_id: String,
    pub is_default: bool,
}

/// The IAM operations policy discovery needs. Every listing is fully
/// paginated by the implementation.
#[async_trait]
pub trait IamApi: Send + Sync {
    async fn list_user_policies(&self, user_name: &str) -> Result<Vec<String>>;
    async fn list_attached_user_policies(&self, user_name: &str) -> Result<Vec<String>>;
    async fn list_groups_for_user(&self, user_name: &str) -> Result<Vec<String>>;
    async fn list_group_policies(&self, group_name: &str) -> Result<Vec<String>>;
    async fn list_attached_group_policies(&self, group_name: &str) -> Result<Vec<String>>;
    async fn list_policy_versions(&self, policy_arn: &str) -> Result<Vec<PolicyVersion>>;
    async fn get_policy_version(&self, policy_arn: &str, version_id: &str) -> Result<String>;
    async fn get_user_policy(&self, user_name: &str, policy_name: &str) -> Result<String>;
    async fn get_group_policy(&self, group_name: &str, policy_name: &str) -> Result<String>;
    async fn list_mfa_devices(&self, user_name: &str) -> Result<Vec<String>>;
}

/// Account alias lookup on behalf of some other set of credentials.
#[async_trait]
pub trait AliasApi: Send + Sync {
    async fn list_account_aliases(&self, credentials: &Credentials) -> Result<Vec<String>>;
}

pub struct SdkIam {
    client: Client,
    config: SdkConfig,
}

impl SdkIam {
    pub fn new(config: &SdkConfig) -> Self {
        SdkIam {
            client: Client::new(config),
            config: config.clone(),
        }
    }
}

fn failed<E: std::error::Error>(operation: &'static str) -> impl Fn(E) -> Error {
    move |err| Error::connectivity(operation, DisplayErrorContext(&err).to_string())
}

#[async_trait]
impl IamApi for SdkIam {
    async fn list_user_policies(&self, user_name: &str) -> Result<Vec<String>> {
        info!("Calling IAM ListUserPolicies for {}", user_name);
        let mut names = vec![];
        let mut pages = self
            .client
            .list_user_policies()
            .user_name(user_name)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(failed("ListUserPolicies"))?;
            names.extend(page.policy_names().iter().cloned());
        }

        Ok(names)
    }

    async fn list_attached_user_policies(&self, user_name: &str) -> Result<Vec<String>> {
        info!("Calling IAM ListAttachedUserPolicies for {}", user_name);
        let mut arns = vec![];
        let mut pages = self
            .client
            .list_attached_user_policies()
            .user_name(user_name)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(failed("ListAttachedUserPolicies"))?;
            arns.extend(
                page.attached_policies()
                    .iter()
                    .filter_map(|policy| policy.policy_arn().map(String::from)),
            );
        }

        Ok(arns)
    }

    async fn list_groups_for_user(&self, user_name: &str) -> Result<Vec<String>> {
        info!("Calling IAM ListGroupsForUser for {}", user_name);
        let mut groups = vec![];
        let mut pages = self
            .client
            .list_groups_for_user()
            .user_name(user_name)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(failed("ListGroupsForUser"))?;
            groups.extend(page.groups().iter().map(|group| group.group_name().to_string()));
        }

        Ok(groups)
    }

    async fn list_group_policies(&self, group_name: &str) -> Result<Vec<String>> {
        info!("Calling IAM ListGroupPolicies for {}", group_name);
        let mut names = vec![];
        let mut pages = self
            .client
            .list_group_policies()
            .group_name(group_name)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(failed("ListGroupPolicies"))?;
            names.extend(page.policy_names().iter().cloned());
        }

        Ok(names)
    }

    async fn list_attached_group_policies(&self, group_name: &str) -> Result<Vec<String>> {
        info!("Calling IAM ListAttachedGroupPolicies for {}", group_name);
        let mut arns = vec![];
        let mut pages = self
            .client
            .list_attached_group_policies()
            .group_name(group_name)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(failed("ListAttachedGroupPolicies"))?;
            arns.extend(
                page.attached_policies()
                    .iter()
                    .filter_map(|policy| policy.policy_arn().map(String::from)),
            );
        }

        Ok(arns)
    }

    async fn list_policy_versions(&self, policy_arn: &str) -> Result<Vec<PolicyVersion>> {
        info!("Calling IAM ListPolicyVersions for {}", policy_arn);
        let mut versions = vec![];
        let mut pages = self
            .client
            .list_policy_versions()
            .policy_arn(policy_arn)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(failed("ListPolicyVersions"))?;
            versions.extend(page.versions().iter().filter_map(|version| {
                Some(PolicyVersion {
                    version_id: version.version_id()?.to_string(),
                    is_default: version.is_default_version(),
                })
            }));
        }

        Ok(versions)
    }

    async fn get_policy_version(&self, policy_arn: &str, version_id: &str) -> Result<String> {
        info!("Calling IAM GetPolicyVersion for {} ({})", policy_arn, version_id);
        let response = self
            .client
            .get_policy_version()
            .policy_arn(policy_arn)
            .version_id(version_id)
            .send()
            .await
            .map_err(failed("GetPolicyVersion"))?;

        response
            .policy_version()
            .and_then(|version| version.document())
            .map(String::from)
            .ok_or_else(|| {
                Error::connectivity(
                    "GetPolicyVersion",
                    format!("{} {} has no document", policy_arn, version_id),
                )
            })
    }

    async fn get_user_policy(&self, user_name: &str, policy_name: &str) -> Result<String> {
        info!("Calling IAM GetUserPolicy for {}/{}", user_name, policy_name);
        let response = self
            .client
            .get_user_policy()
            .user_name(user_name)
            .policy_name(policy_name)
            .send()
            .await
            .map_err(failed("GetUserPolicy"))?;

        Ok(response.policy_document().to_string())
    }

    async fn get_group_policy(&self, group_name: &str, policy_name: &str) -> Result<String> {
        info!("Calling IAM GetGroupPolicy for {}/{}", group_name, policy_name);
        let response = self
            .client
            .get_group_policy()
            .group_name(group_name)
            .policy_name(policy_name)
            .send()
            .await
            .map_err(failed("GetGroupPolicy"))?;

        Ok(response.policy_document().to_string())
    }

    async fn list_mfa_devices(&self, user_name: &str) -> Result<Vec<String>> {
        info!("Calling IAM ListMFADevices for {}", user_name);
        let mut devices = vec![];
        let mut pages = self
            .client
            .list_mfa_devices()
            .user_name(user_name)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| Error::Auth(DisplayErrorContext(&e).to_string()))?;
            devices.extend(
                page.mfa_devices()
                    .iter()
                    .map(|device| device.serial_number().to_string()),
            );
        }

        Ok(devices)
    }
}

#[async_trait]
impl AliasApi for SdkIam {
    async fn list_account_aliases(&self, credentials: &Credentials) -> Result<Vec<String>> {
        info!("Calling IAM ListAccountAliases");
        let provider = aws_credential_types::Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            Some(credentials.session_token.clone()),
            None,
            "assume-profiles",
        );
        let config = aws_sdk_iam::config::Builder::from(&self.config)
            .credentials_provider(provider)
            .build();
        let client = Client::from_conf(config);

        let mut aliases = vec![];
        let mut pages = client.list_account_aliases().into_paginator().send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(failed("ListAccountAliases"))?;
            aliases.extend(page.account_aliases().iter().cloned());
        }

        Ok(aliases)
    }
}
