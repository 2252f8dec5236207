use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Certificate load failed: {} -- {reason}", .path.display())]
    CertificateLoad { path: PathBuf, reason: String },

    #[error("Driver error: {0}")]
    Driver(#[source] anyhow::Error),
}

impl BootstrapError {
    pub fn certificate(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CertificateLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_certificate_load(&self) -> bool {
        matches!(self, Self::CertificateLoad { .. })
    }
}

pub type BootstrapResult<T> = Result<T, BootstrapError>;
