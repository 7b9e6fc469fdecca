pub mod aws;
pub mod diagnostic;
pub mod error;
pub mod logging;
pub mod policy;
pub mod profiles;
pub mod settings;
