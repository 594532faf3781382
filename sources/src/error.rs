//! Error module
//!
//! Every failure of the export workflow ends up in `ExportError`.  Callers that need to react
//! differently depending on the failure look at `ExportError::kind()` instead of matching on the
//! variants' payloads.
//!

use std::path::PathBuf;

use thiserror::Error;

use exporter_common::ConfigError;

use crate::Group;

/// Tag for every kind of failure.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Config,
    EnvironmentLookup,
    HttpStatus,
    Network,
    ManifestNotFound,
    Io,
    Decode,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Environment \"{name}\" {reason}")]
    EnvironmentLookup { name: String, reason: String },
    #[error("Failed HTTP call: {code} {message}")]
    HttpStatus { code: u16, message: String },
    #[error("Failure {cause}")]
    Network { cause: String },
    #[error(
        "did not find \"{date}\" for version=\"{version}\" type=\"{group}\" in downloaded manifests"
    )]
    ManifestNotFound {
        version: String,
        date: String,
        group: Group,
    },
    #[error("Error writing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid content: {0}")]
    Decode(String),
}

impl ExportError {
    /// Return the tag for this error
    ///
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::Config(_) => ErrorKind::Config,
            ExportError::EnvironmentLookup { .. } => ErrorKind::EnvironmentLookup,
            ExportError::HttpStatus { .. } => ErrorKind::HttpStatus,
            ExportError::Network { .. } => ErrorKind::Network,
            ExportError::ManifestNotFound { .. } => ErrorKind::ManifestNotFound,
            ExportError::Io { .. } => ErrorKind::Io,
            ExportError::Decode(_) => ErrorKind::Decode,
        }
    }
}

impl From<reqwest::Error> for ExportError {
    /// Anything coming out of `reqwest` is a transport problem, status codes are checked
    /// separately.
    ///
    fn from(e: reqwest::Error) -> Self {
        ExportError::Network {
            cause: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        ExportError::Decode(e.to_string())
    }
}
