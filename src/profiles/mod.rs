use crate::aws::Credentials;

pub mod materialize;
pub mod merger;
pub mod naming;
pub mod resolver;
pub mod selection;

/// One named entry destined for the `config` and `credentials` files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub arn: String,
    pub region: String,
    pub credentials: Credentials,
}
