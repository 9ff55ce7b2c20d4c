//! Line parser for `SHA256SUMS`-style checksum manifests.
//!
//! Each record line is `<64 hex digits><whitespace>[*]<filename>`, as written
//! by `sha256sum`. The optional asterisk is the binary-mode marker and is not
//! part of the filename. Blank lines and lines that do not fit the pattern
//! are skipped so manifests can carry extra metadata.

use super::manifest::{ChecksumManifest, ManifestRecord};
use super::sha256_digest::{DIGEST_HEX_LEN, Sha256Digest};

/// Parse manifest text into its ordered records.
///
/// # Examples
///
/// ```
/// use codexline_installer::artefact::manifest_parser::parse_manifest;
///
/// let text = format!("{}  *dist/codexline-linux-x64\n\n# signed\n", "0".repeat(64));
/// let manifest = parse_manifest(&text);
/// assert_eq!(manifest.records().len(), 1);
/// assert_eq!(manifest.records()[0].filename(), "dist/codexline-linux-x64");
/// ```
#[must_use]
pub fn parse_manifest(text: &str) -> ChecksumManifest {
    ChecksumManifest::new(text.lines().filter_map(parse_line).collect())
}

/// Parse a single manifest line, returning `None` for blank or
/// non-matching lines.
#[must_use]
pub fn parse_line(line: &str) -> Option<ManifestRecord> {
    let line = line.trim();
    let digest_text = line.get(..DIGEST_HEX_LEN)?;
    let rest = line.get(DIGEST_HEX_LEN..)?;
    // The digest must be followed by at least one whitespace character.
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let digest = Sha256Digest::try_from(digest_text).ok()?;
    let name = rest.trim_start();
    let name = name.strip_prefix('*').unwrap_or(name);
    if name.is_empty() {
        return None;
    }
    Some(ManifestRecord::new(digest, name))
}
