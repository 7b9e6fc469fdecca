use crate::policy::{PolicyDocument, Statement};
use std::collections::BTreeSet;

const ALLOW: &str = "Allow";
const ASSUME_ROLE: &str = "sts:AssumeRole";

/// Accumulates the resources of every `Allow` + `sts:AssumeRole` statement.
///
/// Only assume-role intent is detected here; whether a resource really is a
/// role is left to profile naming.
#[derive(Debug, Default)]
pub struct RoleDiscovery {
    arns: BTreeSet<String>,
}

impl RoleDiscovery {
    pub fn new() -> Self {
        RoleDiscovery::default()
    }

    pub fn scan(&mut self, document: &PolicyDocument) {
        for statement in document.statements.iter().filter(|s| grants_assume_role(s)) {
            self.arns.extend(statement.resources().cloned());
        }
    }

    pub fn into_arns(self) -> BTreeSet<String> {
        self.arns
    }
}

fn grants_assume_role(statement: &Statement) -> bool {
    statement.effect == ALLOW && statement.actions().any(|action| action == ASSUME_ROLE)
}

/// Deduplicated role ARNs granted by `documents`.
pub fn discover_role_arns<'a, I>(documents: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a PolicyDocument>,
{
    let mut discovery = RoleDiscovery::new();
    for document in documents {
        discovery.scan(document);
    }

    discovery.into_arns()
}
