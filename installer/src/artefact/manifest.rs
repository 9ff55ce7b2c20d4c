//! Checksum manifest types.
//!
//! A [`ChecksumManifest`] is the ordered list of records found in a release's
//! `SHA256SUMS` file. Lookups match the asset name exactly or against the
//! record's basename, so `dist/codexline-linux-x64` satisfies a lookup for
//! `codexline-linux-x64`.

use super::sha256_digest::Sha256Digest;
use log::debug;

/// One `<digest> <filename>` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRecord {
    digest: Sha256Digest,
    filename: String,
}

impl ManifestRecord {
    /// Create a record from a validated digest and a filename.
    #[must_use]
    pub fn new(digest: Sha256Digest, filename: impl Into<String>) -> Self {
        Self {
            digest,
            filename: filename.into(),
        }
    }

    /// Expected digest of the named file.
    #[must_use]
    pub fn digest(&self) -> &Sha256Digest {
        &self.digest
    }

    /// Filename as written in the manifest, possibly path-qualified.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Final path component of the filename.
    #[must_use]
    pub fn basename(&self) -> &str {
        self.filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.filename)
    }

    /// Whether this record describes `asset_name`.
    #[must_use]
    pub fn matches(&self, asset_name: &str) -> bool {
        self.filename == asset_name || self.basename() == asset_name
    }
}

/// Ordered records of a checksum manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumManifest {
    records: Vec<ManifestRecord>,
}

impl ChecksumManifest {
    /// Wrap already-parsed records.
    #[must_use]
    pub fn new(records: Vec<ManifestRecord>) -> Self {
        Self { records }
    }

    /// All records in manifest order.
    #[must_use]
    pub fn records(&self) -> &[ManifestRecord] {
        &self.records
    }

    /// Whether the manifest holds no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find the expected digest for `asset_name`.
    ///
    /// The first matching record is authoritative and the scan stops there;
    /// later records for the same asset are never consulted.
    ///
    /// # Examples
    ///
    /// ```
    /// use codexline_installer::artefact::manifest_parser::parse_manifest;
    ///
    /// let manifest = parse_manifest(&format!("{} *out/codexline-linux-x64", "c".repeat(64)));
    /// assert!(manifest.lookup("codexline-linux-x64").is_some());
    /// assert!(manifest.lookup("codexline-linux-arm64").is_none());
    /// ```
    #[must_use]
    pub fn lookup(&self, asset_name: &str) -> Option<&Sha256Digest> {
        let record = self
            .records
            .iter()
            .find(|record| record.matches(asset_name))?;
        debug!("manifest entry {} matches {asset_name}", record.filename());
        Some(record.digest())
    }

    /// Digests of later records for `asset_name` that disagree with the one
    /// [`lookup`](Self::lookup) returns.
    ///
    /// Empty when the asset is absent or every match agrees.
    #[must_use]
    pub fn conflicting_digests(&self, asset_name: &str) -> Vec<&Sha256Digest> {
        let mut matches = self
            .records
            .iter()
            .filter(|record| record.matches(asset_name))
            .map(ManifestRecord::digest);
        let Some(first) = matches.next() else {
            return Vec::new();
        };
        let mut conflicts: Vec<&Sha256Digest> = Vec::new();
        for digest in matches {
            if digest != first && !conflicts.contains(&digest) {
                conflicts.push(digest);
            }
        }
        conflicts
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
