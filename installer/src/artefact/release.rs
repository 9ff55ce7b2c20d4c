//! Release asset URL construction.
//!
//! Binaries and the checksum manifest live side by side under
//! `<base>/<version>/`.

use super::error::{ArtefactError, Result};
use super::target::Target;

/// Default release store prefix.
pub const DEFAULT_BASE_URL: &str = "https://github.com/codexline/codexline/releases/download";

/// Checksum manifest filename, shared by every platform.
pub const CHECKSUM_MANIFEST_NAME: &str = "SHA256SUMS";

/// A versioned location in the release store.
///
/// # Examples
///
/// ```
/// use codexline_installer::artefact::release::ReleaseLocation;
///
/// let location = ReleaseLocation::new("v1.2.3", "https://example.test/dl//")
///     .expect("valid location");
/// assert_eq!(
///     location.manifest_url(),
///     "https://example.test/dl/v1.2.3/SHA256SUMS"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseLocation {
    version: String,
    base_url: String,
}

impl ReleaseLocation {
    /// Create a location, rejecting empty components.
    ///
    /// # Errors
    ///
    /// Returns [`ArtefactError::InvalidReleaseLocation`] when the version or
    /// base URL is blank, or the base URL has no trailing content besides
    /// slashes.
    pub fn new(version: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let version = version.into().trim().to_owned();
        let base_url = base_url.into().trim().to_owned();
        if version.is_empty() {
            return Err(ArtefactError::InvalidReleaseLocation {
                reason: "release version is empty".to_owned(),
            });
        }
        if base_url.trim_end_matches('/').is_empty() {
            return Err(ArtefactError::InvalidReleaseLocation {
                reason: "base URL is empty".to_owned(),
            });
        }
        Ok(Self { version, base_url })
    }

    /// The release version used in URLs, e.g. `v0.4.2`.
    ///
    /// Defaults to the installer's own package version with a `v` prefix.
    #[must_use]
    pub fn default_version() -> String {
        format!("v{}", env!("CARGO_PKG_VERSION"))
    }

    /// Release version segment.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Base URL as configured (trailing slashes preserved).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the binary asset for `target`.
    #[must_use]
    pub fn binary_url(&self, target: &Target) -> String {
        self.asset_url(target.asset_name())
    }

    /// URL of the checksum manifest for this release.
    #[must_use]
    pub fn manifest_url(&self) -> String {
        self.asset_url(CHECKSUM_MANIFEST_NAME)
    }

    fn asset_url(&self, filename: &str) -> String {
        format!(
            "{}/{}/{filename}",
            self.base_url.trim_end_matches('/'),
            self.version
        )
    }
}
