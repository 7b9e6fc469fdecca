use crate::aws::session::IdentitySession;
use crate::aws::Credentials;
use crate::error::Result;
use log::debug;
use std::collections::HashMap;

const MAX_SESSION_NAME: usize = 64;

/// Obtains short-lived credentials per role ARN, at most once per ARN.
pub struct CredentialResolver<'a> {
    session: &'a IdentitySession,
    session_name: String,
    duration_seconds: i32,
    cache: HashMap<String, Credentials>,
}

impl<'a> CredentialResolver<'a> {
    pub fn new(session: &'a IdentitySession, duration_seconds: i32) -> Self {
        CredentialResolver::with_session_name(session, local_session_name(), duration_seconds)
    }

    pub fn with_session_name(
        session: &'a IdentitySession,
        session_name: String,
        duration_seconds: i32,
    ) -> Self {
        CredentialResolver {
            session,
            session_name,
            duration_seconds,
            cache: HashMap::new(),
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Credentials for `role_arn`, or the base session's when `None`.
    pub async fn resolve(&mut self, role_arn: Option<&str>) -> Result<Credentials> {
        let role_arn = match role_arn {
            Some(role_arn) => role_arn,
            None => return Ok(self.session.base_credentials().clone()),
        };

        if let Some(credentials) = self.cache.get(role_arn) {
            debug!("Using memoized credentials for {}", role_arn);
            return Ok(credentials.clone());
        }

        let credentials = self
            .session
            .sts()
            .assume_role(role_arn, &self.session_name, self.duration_seconds)
            .await?;
        self.cache.insert(role_arn.to_string(), credentials.clone());

        Ok(credentials)
    }

    /// Aliases of the account `credentials` belong to; empty when none are set.
    pub async fn resolve_aliases(&self, credentials: &Credentials) -> Result<Vec<String>> {
        self.session.aliases().list_account_aliases(credentials).await
    }

    pub fn invalidate(&mut self) {
        self.cache.clear();
    }
}

/// `{user}-{host}`, restricted to what STS accepts as a role session name.
pub fn session_name(user: &str, host: &str) -> String {
    let name: String = format!("{}-{}", user, host)
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() => c,
            '_' | '+' | '=' | ',' | '.' | '@' | '-' => c,
            _ => '-',
        })
        .take(MAX_SESSION_NAME)
        .collect();

    if name.len() < 2 {
        return String::from("assume-profiles");
    }

    name
}

fn local_session_name() -> String {
    let host = whoami::fallible::hostname().unwrap_or_else(|_| String::from("localhost"));
    session_name(&whoami::username(), &host)
}
