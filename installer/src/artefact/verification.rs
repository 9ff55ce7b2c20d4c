//! Verification policy for installed binary integrity.
//!
//! The policy is a value type: it records whether the checksum manifest is
//! consulted at all and whether a missing manifest or manifest entry is
//! fatal. Hashing and comparison live in [`crate::checksum`].

use std::fmt;

/// Policy governing how an installed binary is verified.
///
/// # Examples
///
/// ```
/// use codexline_installer::artefact::verification::VerificationPolicy;
///
/// let policy = VerificationPolicy::default();
/// assert!(policy.verify());
/// assert!(!policy.require_checksum());
/// assert_eq!(policy.to_string(), "checksum verification enabled (lenient)");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationPolicy {
    verify: bool,
    require_checksum: bool,
}

impl VerificationPolicy {
    /// Build a policy from its two switches.
    #[must_use]
    pub const fn new(verify: bool, require_checksum: bool) -> Self {
        Self {
            verify,
            require_checksum,
        }
    }

    /// Policy that skips checksum verification entirely.
    #[must_use]
    pub const fn disabled() -> Self {
        Self::new(false, false)
    }

    /// Whether the downloaded binary is checked against the manifest.
    #[must_use]
    pub const fn verify(&self) -> bool {
        self.verify
    }

    /// Whether an unavailable manifest or a missing entry fails the install.
    ///
    /// When false, those cases produce a warning and the binary is kept
    /// unverified. A digest mismatch is always fatal.
    #[must_use]
    pub const fn require_checksum(&self) -> bool {
        self.require_checksum
    }
}

impl Default for VerificationPolicy {
    /// Verify when a manifest is available, tolerate its absence.
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl fmt::Display for VerificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.verify, self.require_checksum) {
            (false, _) => write!(f, "checksum verification disabled"),
            (true, false) => write!(f, "checksum verification enabled (lenient)"),
            (true, true) => write!(f, "checksum verification required"),
        }
    }
}
