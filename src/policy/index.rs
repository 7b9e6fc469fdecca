use crate::aws::iam_api::IamApi;
use crate::aws::Identity;
use crate::error::{Error, Result};
use crate::policy::{PolicyDocument, PolicyRef};
use log::debug;
use std::collections::{BTreeSet, HashMap};

/// Every policy reachable by one identity, and their default documents.
///
/// Lookups are memoized until [`PolicyIndex::invalidate`] is called.
pub struct PolicyIndex<'a> {
    iam: &'a dyn IamApi,
    refs: Option<BTreeSet<PolicyRef>>,
    documents: HashMap<PolicyRef, PolicyDocument>,
}

impl<'a> PolicyIndex<'a> {
    pub fn new(iam: &'a dyn IamApi) -> Self {
        PolicyIndex {
            iam,
            refs: None,
            documents: HashMap::new(),
        }
    }

    /// User inline, user attached, and for each group the group's inline and
    /// attached policies, merged by identity.
    pub async fn policy_refs(&mut self, identity: &Identity) -> Result<&BTreeSet<PolicyRef>> {
        if self.refs.is_none() {
            let refs = self.collect_refs(&identity.user_name).await?;
            debug!("{} policies reachable by {}", refs.len(), identity.user_name);
            self.refs = Some(refs);
        }

        Ok(self.refs.get_or_insert_with(BTreeSet::new))
    }

    async fn collect_refs(&self, user_name: &str) -> Result<BTreeSet<PolicyRef>> {
        let mut refs = BTreeSet::new();

        for policy_name in self.iam.list_user_policies(user_name).await? {
            refs.insert(PolicyRef::UserInline {
                user_name: user_name.to_string(),
                policy_name,
            });
        }
        for arn in self.iam.list_attached_user_policies(user_name).await? {
            refs.insert(PolicyRef::Managed(arn));
        }

        for group_name in self.iam.list_groups_for_user(user_name).await? {
            for policy_name in self.iam.list_group_policies(&group_name).await? {
                refs.insert(PolicyRef::GroupInline {
                    group_name: group_name.clone(),
                    policy_name,
                });
            }
            for arn in self.iam.list_attached_group_policies(&group_name).await? {
                refs.insert(PolicyRef::Managed(arn));
            }
        }

        Ok(refs)
    }

    /// The document a policy currently enforces: the default version for a
    /// managed policy, the only version for an inline one.
    pub async fn policy_document(&mut self, policy: &PolicyRef) -> Result<&PolicyDocument> {
        if !self.documents.contains_key(policy) {
            let document = self.fetch_document(policy).await?;
            self.documents.insert(policy.clone(), document);
        }

        self.documents
            .get(policy)
            .ok_or_else(|| Error::connectivity("GetPolicy", format!("{} vanished", policy)))
    }

    async fn fetch_document(&self, policy: &PolicyRef) -> Result<PolicyDocument> {
        match policy {
            PolicyRef::Managed(arn) => {
                let versions = self.iam.list_policy_versions(arn).await?;
                let default = versions
                    .into_iter()
                    .find(|version| version.is_default)
                    .ok_or_else(|| {
                        Error::connectivity(
                            "ListPolicyVersions",
                            format!("{} has no default version", arn),
                        )
                    })?;
                let document = self.iam.get_policy_version(arn, &default.version_id).await?;

                PolicyDocument::parse(policy.clone(), Some(default.version_id), &document)
            }
            PolicyRef::UserInline {
                user_name,
                policy_name,
            } => {
                let document = self.iam.get_user_policy(user_name, policy_name).await?;
                PolicyDocument::parse(policy.clone(), None, &document)
            }
            PolicyRef::GroupInline {
                group_name,
                policy_name,
            } => {
                let document = self.iam.get_group_policy(group_name, policy_name).await?;
                PolicyDocument::parse(policy.clone(), None, &document)
            }
        }
    }

    /// Every reachable document, fetched one at a time in policy order.
    pub async fn policy_documents(&mut self, identity: &Identity) -> Result<Vec<PolicyDocument>> {
        let refs: Vec<PolicyRef> = self.policy_refs(identity).await?.iter().cloned().collect();
        let mut documents = Vec::with_capacity(refs.len());
        for policy in &refs {
            documents.push(self.policy_document(policy).await?.clone());
        }

        Ok(documents)
    }

    pub fn invalidate(&mut self) {
        self.refs = None;
        self.documents.clear();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::aws::iam_api::PolicyVersion;
    use async_trait::async_trait;
    use std::sync::Mutex;

    pub(crate) const ASSUME_DEV: &str = r#"{"Statement": {"Effect": "Allow",
        "Action": "sts:AssumeRole", "Resource": "arn:aws:iam::111111111111:role/Dev"}}"#;
    pub(crate) const ASSUME_OPS: &str = r#"{"Statement": [{"Effect": "Allow",
        "Action": "sts:AssumeRole", "Resource": ["arn:aws:iam::222222222222:role/Dev"]}]}"#;

    /// User `bob` in group `admins`; both carry an inline and a managed policy,
    /// and the group re-attaches the user's managed policy.
    #[derive(Default)]
    pub(crate) struct IamApiTest {
        pub calls: Mutex<Vec<String>>,
        pub fail_listing: bool,
    }

    impl IamApiTest {
        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }

        pub fn count(&self, call: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
        }
    }

    #[async_trait]
    impl IamApi for IamApiTest {
        async fn list_user_policies(&self, _user_name: &str) -> Result<Vec<String>> {
            self.record("ListUserPolicies");
            if self.fail_listing {
                return Err(Error::connectivity("ListUserPolicies", "connection reset"));
            }
            Ok(vec![String::from("bob-inline")])
        }

        async fn list_attached_user_policies(&self, _user_name: &str) -> Result<Vec<String>> {
            self.record("ListAttachedUserPolicies");
            Ok(vec![String::from("arn:aws:iam::000000000000:policy/Shared")])
        }

        async fn list_groups_for_user(&self, _user_name: &str) -> Result<Vec<String>> {
            self.record("ListGroupsForUser");
            Ok(vec![String::from("admins")])
        }

        async fn list_group_policies(&self, _group_name: &str) -> Result<Vec<String>> {
            self.record("ListGroupPolicies");
            Ok(vec![String::from("admins-inline")])
        }

        async fn list_attached_group_policies(&self, _group_name: &str) -> Result<Vec<String>> {
            self.record("ListAttachedGroupPolicies");
            Ok(vec![String::from("arn:aws:iam::000000000000:policy/Shared")])
        }

        async fn list_policy_versions(&self, _policy_arn: &str) -> Result<Vec<PolicyVersion>> {
            self.record("ListPolicyVersions");
            Ok(vec![
                PolicyVersion {
                    version_id: String::from("v1"),
                    is_default: false,
                },
                PolicyVersion {
                    version_id: String::from("v2"),
                    is_default: true,
                },
            ])
        }

        async fn get_policy_version(&self, _policy_arn: &str, version_id: &str) -> Result<String> {
            self.record("GetPolicyVersion");
            match version_id {
                "v2" => Ok(ASSUME_OPS.to_string()),
                _ => Ok(String::from(r#"{"Statement": []}"#)),
            }
        }

        async fn get_user_policy(&self, _user_name: &str, _policy_name: &str) -> Result<String> {
            self.record("GetUserPolicy");
            Ok(ASSUME_DEV.to_string())
        }

        async fn get_group_policy(&self, _group_name: &str, _policy_name: &str) -> Result<String> {
            self.record("GetGroupPolicy");
            Ok(String::from(r#"{"Statement": {"Effect": "Allow", "Action": "s3:*", "Resource": "*"}}"#))
        }

        async fn list_mfa_devices(&self, _user_name: &str) -> Result<Vec<String>> {
            self.record("ListMFADevices");
            Ok(vec![String::from("arn:aws:iam::111111111111:mfa/bob")])
        }
    }

    pub(crate) fn identity() -> Identity {
        Identity::from_arn("arn:aws:iam::111111111111:user/bob").unwrap()
    }

    #[tokio::test]
    async fn test_policy_refs_are_merged() {
        let iam = IamApiTest::default();
        let mut index = PolicyIndex::new(&iam);

        let refs = index.policy_refs(&identity()).await.unwrap().clone();

        assert_eq!(refs.len(), 3);
        assert!(refs.contains(&PolicyRef::Managed(String::from(
            "arn:aws:iam::000000000000:policy/Shared"
        ))));
        assert!(refs.contains(&PolicyRef::UserInline {
            user_name: String::from("bob"),
            policy_name: String::from("bob-inline"),
        }));
        assert!(refs.contains(&PolicyRef::GroupInline {
            group_name: String::from("admins"),
            policy_name: String::from("admins-inline"),
        }));
    }

    #[tokio::test]
    async fn test_policy_refs_are_cached_until_invalidated() {
        let iam = IamApiTest::default();
        let mut index = PolicyIndex::new(&iam);

        index.policy_refs(&identity()).await.unwrap();
        index.policy_refs(&identity()).await.unwrap();
        assert_eq!(iam.count("ListUserPolicies"), 1);

        index.invalidate();
        index.policy_refs(&identity()).await.unwrap();
        assert_eq!(iam.count("ListUserPolicies"), 2);
    }

    #[tokio::test]
    async fn test_managed_policy_uses_default_version() {
        let iam = IamApiTest::default();
        let mut index = PolicyIndex::new(&iam);
        let policy = PolicyRef::Managed(String::from("arn:aws:iam::000000000000:policy/Shared"));

        let document = index.policy_document(&policy).await.unwrap().clone();
        index.policy_document(&policy).await.unwrap();

        assert_eq!(document.version_id.as_deref(), Some("v2"));
        assert_eq!(document.statements.len(), 1);
        assert_eq!(iam.count("GetPolicyVersion"), 1);
    }

    #[tokio::test]
    async fn test_policy_documents() {
        let iam = IamApiTest::default();
        let mut index = PolicyIndex::new(&iam);

        let documents = index.policy_documents(&identity()).await.unwrap();

        assert_eq!(documents.len(), 3);
        assert_eq!(iam.count("GetUserPolicy"), 1);
        assert_eq!(iam.count("GetGroupPolicy"), 1);
        assert_eq!(iam.count("ListPolicyVersions"), 1);
    }

    #[tokio::test]
    async fn test_listing_failure_propagates() {
        let iam = IamApiTest {
            fail_listing: true,
            ..Default::default()
        };
        let mut index = PolicyIndex::new(&iam);

        let result = index.policy_documents(&identity()).await;

        assert!(matches!(result, Err(Error::Connectivity { .. })));
    }
}
