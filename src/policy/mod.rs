use crate::error::{Error, Result};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use std::fmt;

pub mod discovery;
pub mod index;

/// Identifies a policy reachable by the identity. Inline policies have no
/// ARN of their own, so they are keyed by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PolicyRef {
    Managed(String),
    UserInline {
        user_name: String,
        policy_name: String,
    },
    GroupInline {
        group_name: String,
        policy_name: String,
    },
}

impl fmt::Display for PolicyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyRef::Managed(arn) => f.write_str(arn),
            PolicyRef::UserInline {
                user_name,
                policy_name,
            } => write!(f, "user/{}/{}", user_name, policy_name),
            PolicyRef::GroupInline {
                group_name,
                policy_name,
            } => write!(f, "group/{}/{}", group_name, policy_name),
        }
    }
}

/// IAM lets most list-valued fields be written as a bare value.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value).iter(),
            OneOrMany::Many(values) => values.iter(),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    #[serde(default)]
    pub effect: String,
    #[serde(default)]
    pub action: Option<OneOrMany<String>>,
    #[serde(default)]
    pub resource: Option<OneOrMany<String>>,
}

impl Statement {
    pub fn actions(&self) -> impl Iterator<Item = &String> {
        self.action.iter().flat_map(|action| action.iter())
    }

    pub fn resources(&self) -> impl Iterator<Item = &String> {
        self.resource.iter().flat_map(|resource| resource.iter())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawDocument {
    #[serde(default)]
    statement: Option<OneOrMany<Statement>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    pub policy: PolicyRef,
    pub version_id: Option<String>,
    pub statements: Vec<Statement>,
}

impl PolicyDocument {
    /// Parses a document as IAM returns it: URL-encoded JSON.
    pub fn parse(policy: PolicyRef, version_id: Option<String>, document: &str) -> Result<Self> {
        let decoded = percent_decode_str(document).decode_utf8_lossy();
        let raw: RawDocument = serde_json::from_str(&decoded).map_err(|e| {
            Error::connectivity("ParsePolicyDocument", format!("{}: {}", policy, e))
        })?;

        Ok(PolicyDocument {
            policy,
            version_id,
            statements: raw.statement.map(OneOrMany::into_vec).unwrap_or_default(),
        })
    }
}
