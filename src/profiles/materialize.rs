use crate::aws::session::IdentitySession;
use crate::aws::{Credentials, RoleArn};
use crate::diagnostic;
use crate::error::{Error, Result};
use crate::policy::discovery::discover_role_arns;
use crate::policy::index::PolicyIndex;
use crate::profiles::merger::{config_section, credentials_section, update};
use crate::profiles::naming::name_candidates;
use crate::profiles::resolver::CredentialResolver;
use crate::profiles::selection::Selection;
use crate::profiles::Profile;
use log::{info, warn};
use std::path::Path;

pub const CONFIG_FILE: &str = "config";
pub const CREDENTIALS_FILE: &str = "credentials";

/// A role that could not be resolved. Its profiles are still emitted, with
/// empty key material.
#[derive(Debug)]
pub struct RoleFailure {
    pub arn: String,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct Report {
    pub profiles: Vec<Profile>,
    pub failures: Vec<RoleFailure>,
}

/// Runs discovery, resolution and naming for one identity session.
pub struct ProfileMaterializer<'a> {
    session: &'a IdentitySession,
    index: PolicyIndex<'a>,
    resolver: CredentialResolver<'a>,
    selection: Selection,
}

impl<'a> ProfileMaterializer<'a> {
    pub fn new(session: &'a IdentitySession, selection: Selection, duration_seconds: i32) -> Self {
        ProfileMaterializer::with_resolver(
            session,
            selection,
            CredentialResolver::new(session, duration_seconds),
        )
    }

    pub fn with_resolver(
        session: &'a IdentitySession,
        selection: Selection,
        resolver: CredentialResolver<'a>,
    ) -> Self {
        ProfileMaterializer {
            session,
            index: PolicyIndex::new(session.iam()),
            resolver,
            selection,
        }
    }

    /// Selected role ARNs granted to the identity, in sorted order.
    pub async fn discover(&mut self) -> Result<Vec<RoleArn>> {
        let identity = self.session.identity();
        let documents = self.index.policy_documents(identity).await?;
        let mut arns = vec![];
        for arn in discover_role_arns(&documents) {
            match RoleArn::parse(&arn) {
                Some(parsed) if self.selection.includes(&parsed) => arns.push(parsed),
                Some(_) => {}
                None => warn!("Skipping {}: not an assumable resource", arn),
            }
        }
        info!("Discovered {} assumable roles", arns.len());

        Ok(arns)
    }

    pub async fn materialize(&mut self) -> Result<Report> {
        let mut report = Report::default();

        if let Some(identity_arn) = self.session.identity().role_arn() {
            if self.selection.includes(&identity_arn) {
                let credentials = self.resolver.resolve(None).await?;
                let aliases = match self.resolver.resolve_aliases(&credentials).await {
                    Ok(aliases) => aliases,
                    Err(error) => {
                        report_failure(identity_arn.arn(), &error);
                        report.failures.push(RoleFailure {
                            arn: identity_arn.to_string(),
                            error,
                        });
                        vec![]
                    }
                };
                self.push_profiles(&mut report, &identity_arn, &aliases, credentials);
            }
        }

        for arn in self.discover().await? {
            let (credentials, aliases) = match self.resolve_role(&arn).await {
                Ok(resolved) => resolved,
                Err(error) => {
                    report_failure(arn.arn(), &error);
                    report.failures.push(RoleFailure {
                        arn: arn.to_string(),
                        error,
                    });
                    (Credentials::empty(), vec![])
                }
            };
            self.push_profiles(&mut report, &arn, &aliases, credentials);
        }

        Ok(report)
    }

    async fn resolve_role(&mut self, arn: &RoleArn) -> Result<(Credentials, Vec<String>)> {
        let credentials = self.resolver.resolve(Some(arn.arn())).await?;
        let aliases = self.resolver.resolve_aliases(&credentials).await?;

        Ok((credentials, aliases))
    }

    fn push_profiles(
        &self,
        report: &mut Report,
        arn: &RoleArn,
        aliases: &[String],
        credentials: Credentials,
    ) {
        for name in name_candidates(arn, aliases) {
            report.profiles.push(Profile {
                name,
                arn: arn.to_string(),
                region: self.session.region().to_string(),
                credentials: credentials.clone(),
            });
        }
    }

    /// Forgets every cached policy, document and credential.
    pub fn invalidate(&mut self) {
        self.index.invalidate();
        self.resolver.invalidate();
    }
}

fn report_failure(arn: &str, error: &Error) {
    let detail = diagnostic::encode(&error.to_string()).unwrap_or_default();
    warn!("Could not resolve {}; writing an empty profile. Details: {}", arn, detail);
}

/// Upserts `profiles` into `{config_dir}/config` and `{config_dir}/credentials`.
pub fn write_profiles(profiles: &[Profile], config_dir: &Path) -> Result<()> {
    update(profiles, &config_dir.join(CONFIG_FILE), config_section)?;
    update(profiles, &config_dir.join(CREDENTIALS_FILE), credentials_section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::iam_api::{IamApi, PolicyVersion};
    use crate::policy::index::tests::identity;
    use crate::profiles::merger::ConfigStore;
    use crate::profiles::resolver::tests::{base_credentials, AliasApiTest, StsApiTest};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// A user whose single inline policy grants the given resources.
    struct GrantingIam {
        resources: Vec<&'static str>,
    }

    #[async_trait]
    impl IamApi for GrantingIam {
        async fn list_user_policies(&self, _user_name: &str) -> Result<Vec<String>> {
            Ok(vec![String::from("assume")])
        }

        async fn list_attached_user_policies(&self, _user_name: &str) -> Result<Vec<String>> {
            Ok(vec![])
        }

        async fn list_groups_for_user(&self, _user_name: &str) -> Result<Vec<String>> {
            Ok(vec![])
        }

        async fn list_group_policies(&self, _group_name: &str) -> Result<Vec<String>> {
            Ok(vec![])
        }

        async fn list_attached_group_policies(&self, _group_name: &str) -> Result<Vec<String>> {
            Ok(vec![])
        }

        async fn list_policy_versions(&self, _policy_arn: &str) -> Result<Vec<PolicyVersion>> {
            Ok(vec![])
        }

        async fn get_policy_version(&self, _policy_arn: &str, _version_id: &str) -> Result<String> {
            Err(Error::connectivity("GetPolicyVersion", "unexpected"))
        }

        async fn get_user_policy(&self, _user_name: &str, _policy_name: &str) -> Result<String> {
            let resources: Vec<String> = self.resources.iter().map(|r| format!("\"{}\"", r)).collect();
            Ok(format!(
                r#"{{"Statement": {{"Effect": "Allow", "Action": "sts:AssumeRole", "Resource": [{}]}}}}"#,
                resources.join(",")
            ))
        }

        async fn get_group_policy(&self, _group_name: &str, _policy_name: &str) -> Result<String> {
            Err(Error::connectivity("GetGroupPolicy", "unexpected"))
        }

        async fn list_mfa_devices(&self, _user_name: &str) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    const DEV_ONE: &str = "arn:aws:iam::111111111111:role/Dev";
    const DEV_TWO: &str = "arn:aws:iam::222222222222:role/Dev";

    fn session(resources: Vec<&'static str>, sts: StsApiTest) -> IdentitySession {
        let mut aliases = HashMap::new();
        aliases.insert(String::from("111111111111"), vec![String::from("alpha")]);
        aliases.insert(String::from("222222222222"), vec![]);

        IdentitySession::new(
            identity(),
            base_credentials(),
            String::from("eu-west-1"),
            Box::new(GrantingIam { resources }),
            Box::new(sts),
            Box::new(AliasApiTest { aliases }),
        )
    }

    fn role_only() -> Selection {
        // The base identity has no role name, so any role filter drops it.
        Selection::new(vec![], vec![String::from("Dev")])
    }

    fn names(report: &Report) -> Vec<&str> {
        report.profiles.iter().map(|p| p.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_profile_names_from_aliases_and_account_ids() {
        let session = session(vec![DEV_TWO, DEV_ONE, DEV_ONE], StsApiTest::default());
        let mut materializer = ProfileMaterializer::new(&session, role_only(), 3600);

        let report = materializer.materialize().await.unwrap();

        assert_eq!(names(&report), vec!["alpha-Dev", "222222222222-Dev"]);
        assert!(report.failures.is_empty());
        assert_eq!(report.profiles[0].region, "eu-west-1");
        assert_eq!(report.profiles[0].credentials.access_key_id, "AKID-111111111111");
    }

    #[tokio::test]
    async fn test_base_identity_profile_is_unsuffixed() {
        let session = session(vec![DEV_TWO], StsApiTest::default());
        let mut materializer = ProfileMaterializer::new(&session, Selection::default(), 3600);

        let report = materializer.materialize().await.unwrap();

        assert_eq!(names(&report), vec!["alpha", "222222222222-Dev"]);
        assert_eq!(report.profiles[0].credentials, base_credentials());
        assert_eq!(report.profiles[0].arn, identity().arn);
    }

    #[tokio::test]
    async fn test_failed_role_does_not_abort_batch() {
        let mut sts = StsApiTest::default();
        sts.denied.insert(DEV_ONE.to_string());
        let session = session(vec![DEV_ONE, DEV_TWO], sts);
        let mut materializer = ProfileMaterializer::new(&session, role_only(), 3600);

        let report = materializer.materialize().await.unwrap();

        assert_eq!(names(&report), vec!["111111111111-Dev", "222222222222-Dev"]);
        assert!(report.profiles[0].credentials.is_empty());
        assert_eq!(report.profiles[1].credentials.access_key_id, "AKID-222222222222");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].arn, DEV_ONE);
        assert!(matches!(report.failures[0].error, Error::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_each_role_is_assumed_once() {
        let sts = StsApiTest::default();
        let calls = sts.assume_calls.clone();
        let session = session(vec![DEV_ONE, DEV_TWO, DEV_ONE], sts);
        let mut materializer = ProfileMaterializer::new(&session, Selection::default(), 3600);

        materializer.materialize().await.unwrap();
        materializer.materialize().await.unwrap();

        assert_eq!(calls.lock().unwrap().clone(), vec![DEV_ONE, DEV_TWO]);

        materializer.invalidate();
        materializer.materialize().await.unwrap();
        assert_eq!(calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_account_filter() {
        let session = session(vec![DEV_ONE, DEV_TWO], StsApiTest::default());
        let selection = Selection::new(vec![String::from("222222222222")], vec![]);
        let mut materializer = ProfileMaterializer::new(&session, selection, 3600);

        let report = materializer.materialize().await.unwrap();

        assert_eq!(names(&report), vec!["222222222222-Dev"]);
    }

    #[tokio::test]
    async fn test_unparseable_resources_are_skipped() {
        let session = session(vec!["*", DEV_TWO], StsApiTest::default());
        let mut materializer = ProfileMaterializer::new(&session, role_only(), 3600);

        let arns = materializer.discover().await.unwrap();

        assert_eq!(arns.len(), 1);
        assert_eq!(arns[0].arn(), DEV_TWO);
    }

    #[tokio::test]
    async fn test_write_profiles() {
        let root = tempfile::tempdir().unwrap();
        let config_dir = root.path().join(".aws");
        let session = session(vec![DEV_ONE, DEV_TWO], StsApiTest::default());
        let mut materializer = ProfileMaterializer::new(&session, role_only(), 3600);
        let report = materializer.materialize().await.unwrap();

        write_profiles(&report.profiles, &config_dir).unwrap();

        let config = ConfigStore::load(&config_dir.join(CONFIG_FILE)).unwrap();
        assert_eq!(
            config.sections(),
            vec!["profile alpha-Dev", "profile 222222222222-Dev"]
        );
        assert_eq!(config.get("profile alpha-Dev", "region").as_deref(), Some("eu-west-1"));

        let credentials = ConfigStore::load(&config_dir.join(CREDENTIALS_FILE)).unwrap();
        assert_eq!(
            credentials.get("222222222222-Dev", "aws_session_token").as_deref(),
            Some("TOKEN-222222222222")
        );
    }
}
