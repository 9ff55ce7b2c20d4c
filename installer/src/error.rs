//! Error types for the codexline installer.
//!
//! Every hard failure maps to an [`InstallStage`] so the final report can
//! name where the install stopped.

use camino::Utf8PathBuf;
use std::fmt;
use std::io;
use thiserror::Error;

use crate::checksum::ChecksumError;
use crate::config::ConfigError;
use crate::install::DownloadAttemptError;
use crate::retry::RetryError;
use crate::stager::StagingError;

/// Phase of an install run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    /// Reading configuration.
    Configure,
    /// Fetching and staging the binary.
    Download,
    /// Checking the binary against the manifest.
    Verify,
    /// Applying permissions.
    Finalize,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configure => "configure",
            Self::Download => "download",
            Self::Verify => "verify",
            Self::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// Errors that abort an install.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// Configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The output directory could not be created.
    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        /// The directory that could not be created.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Every download attempt failed.
    #[error(transparent)]
    Download(Box<RetryError<DownloadAttemptError>>),

    /// The local filesystem rejected the staged binary.
    #[error(transparent)]
    Staging(#[from] StagingError),

    /// The binary failed checksum verification.
    #[error(transparent)]
    Checksum(#[from] ChecksumError),

    /// The installed binary could not be made executable.
    #[error("failed to make {path} executable: {source}")]
    Permissions {
        /// The installed binary.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl InstallerError {
    /// The stage at which this error stopped the install.
    ///
    /// # Examples
    ///
    /// ```
    /// use codexline_installer::config::ConfigError;
    /// use codexline_installer::error::{InstallStage, InstallerError};
    ///
    /// let err = InstallerError::from(ConfigError::NoDataDir { reason: "none".to_owned() });
    /// assert_eq!(err.stage(), InstallStage::Configure);
    /// ```
    #[must_use]
    pub fn stage(&self) -> InstallStage {
        match self {
            Self::Config(_) => InstallStage::Configure,
            Self::OutputDir { .. } | Self::Download(_) | Self::Staging(_) => InstallStage::Download,
            Self::Checksum(_) => InstallStage::Verify,
            Self::Permissions { .. } => InstallStage::Finalize,
        }
    }
}

impl From<RetryError<DownloadAttemptError>> for InstallerError {
    fn from(err: RetryError<DownloadAttemptError>) -> Self {
        Self::Download(Box::new(err))
    }
}

/// Result type alias for installer operations.
pub type Result<T> = std::result::Result<T, InstallerError>;
