use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

pub mod iam_api;
pub mod session;
pub mod sts_api;

fn arn_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^arn:[^:]+:[^:]+:[^:]*:([0-9]+):([^/:]+)[/:]?(.*)$")
            .expect("arn pattern is valid")
    })
}

/// A resource ARN split into the parts profile naming cares about.
///
/// Only `role/...` resources carry a role name; everything else (users,
/// assumed-role sessions, ...) keeps `role_name` empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleArn {
    arn: String,
    account_id: String,
    resource_type: String,
    role_name: String,
}

impl RoleArn {
    /// `None` for anything that is not an ARN with a concrete account id,
    /// e.g. a bare `*` resource.
    pub fn parse(arn: &str) -> Option<Self> {
        let captures = arn_regex().captures(arn)?;

        let account_id = captures
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let resource_type = captures
            .get(2)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let resource = captures.get(3).map(|m| m.as_str()).unwrap_or_default();

        // role/path/to/Name -> Name
        let role_name = if resource_type == "role" {
            resource.rsplit('/').next().unwrap_or_default().to_string()
        } else {
            String::new()
        };

        Some(RoleArn {
            arn: arn.to_string(),
            account_id,
            resource_type,
            role_name,
        })
    }

    pub fn arn(&self) -> &str {
        &self.arn
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Empty unless the resource is a role.
    pub fn role_name(&self) -> &str {
        &self.role_name
    }

    pub fn is_role(&self) -> bool {
        self.resource_type == "role" && !self.role_name.is_empty()
    }
}

impl fmt::Display for RoleArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.arn)
    }
}

/// Short-lived key material. An all-empty value stands in for a role whose
/// credentials could not be resolved.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Credentials {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
        }
    }

    pub fn empty() -> Self {
        Credentials::default()
    }

    pub fn is_empty(&self) -> bool {
        self.access_key_id.is_empty()
            && self.secret_access_key.is_empty()
            && self.session_token.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .finish()
    }
}

/// The caller behind the base session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub account_id: String,
    pub user_name: String,
    pub arn: String,
}

impl Identity {
    pub fn from_arn(arn: &str) -> Result<Self> {
        let parsed = RoleArn::parse(arn)
            .ok_or_else(|| Error::Auth(format!("caller arn could not be parsed: {arn}")))?;
        if parsed.resource_type() != "user" {
            return Err(Error::Auth(format!(
                "caller {arn} is not an IAM user; policies can only be listed for users"
            )));
        }

        let user_name = arn
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::Auth(format!("could not parse user name from {arn}")))?
            .to_string();

        Ok(Identity {
            account_id: parsed.account_id().to_string(),
            user_name,
            arn: arn.to_string(),
        })
    }

    pub fn role_arn(&self) -> Option<RoleArn> {
        RoleArn::parse(&self.arn)
    }
}
