use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the profile pipeline.
///
/// `Auth` and `Connectivity` abort a run. `PermissionDenied` is scoped to a
/// single role and is recovered from by the materializer. `ConfigIo` is fatal.
#[derive(Error, Debug)]
pub enum Error {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("{operation} failed: {message}")]
    Connectivity {
        operation: &'static str,
        message: String,
    },

    #[error("access denied for {arn}: {message}")]
    PermissionDenied { arn: String, message: String },

    #[error("could not materialize {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn connectivity(operation: &'static str, message: impl Into<String>) -> Self {
        Error::Connectivity {
            operation,
            message: message.into(),
        }
    }

    pub fn config_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::ConfigIo {
            path: path.into(),
            source,
        }
    }
}
