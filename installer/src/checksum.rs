//! Verification of an installed binary against the release's `SHA256SUMS`.
//!
//! The manifest download runs under its own retry budget. What happens when
//! the manifest or the asset's entry is missing depends on the
//! `require_checksum` switch: fatal when set, a warning otherwise. A digest
//! mismatch is always fatal and never retried.

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::io::{self, Write};

use crate::artefact::download::{FetchError, Fetcher, fetch_text};
use crate::artefact::manifest_parser::parse_manifest;
use crate::artefact::sha256_digest::{Sha256Digest, compute_sha256};
use crate::output::write_stderr_line;
use crate::retry::{RetryError, RetryPolicy, Sleeper, with_retry};

/// Operation name used in retry warnings for the manifest download.
pub const MANIFEST_OPERATION: &str = "checksum manifest download";

/// Result of a verification that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The installed file matches the manifest digest.
    Verified {
        /// The digest both sides agree on.
        digest: Sha256Digest,
    },
    /// Verification was skipped under the lenient policy.
    Skipped {
        /// Why no comparison took place.
        reason: String,
    },
}

/// Checksum verification failures.
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    /// The manifest could not be downloaded and a checksum is required.
    #[error("checksum file unavailable at {url}: {source}")]
    Unavailable {
        /// The manifest URL.
        url: String,
        /// The exhausted retry error.
        #[source]
        source: Box<RetryError<FetchError>>,
    },

    /// The manifest has no entry for the asset and a checksum is required.
    #[error("no checksum entry for {asset} in {url}")]
    EntryMissing {
        /// The asset that was looked up.
        asset: String,
        /// The manifest URL.
        url: String,
    },

    /// The installed file does not match the manifest.
    #[error("checksum mismatch for {path}: expected {expected}, actual {actual}")]
    Mismatch {
        /// The installed file.
        path: Utf8PathBuf,
        /// Digest recorded in the manifest.
        expected: Sha256Digest,
        /// Digest of the installed file.
        actual: Sha256Digest,
    },

    /// The installed file could not be hashed.
    #[error("failed to hash {path}: {source}")]
    Hash {
        /// The installed file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Compares an installed binary against its release manifest.
pub struct ChecksumVerifier<'a> {
    fetcher: &'a dyn Fetcher,
    sleeper: &'a dyn Sleeper,
    retry: RetryPolicy,
    require_checksum: bool,
}

impl<'a> ChecksumVerifier<'a> {
    /// Create a verifier using `fetcher` for the manifest download.
    #[must_use]
    pub fn new(
        fetcher: &'a dyn Fetcher,
        sleeper: &'a dyn Sleeper,
        retry: RetryPolicy,
        require_checksum: bool,
    ) -> Self {
        Self {
            fetcher,
            sleeper,
            retry,
            require_checksum,
        }
    }

    /// Verify `installed` against the manifest entry for `asset_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ChecksumError::Mismatch`] or [`ChecksumError::Hash`]
    /// whenever a comparison is attempted and fails. Returns
    /// [`ChecksumError::Unavailable`] or [`ChecksumError::EntryMissing`]
    /// only when a checksum is required.
    pub fn verify(
        &self,
        manifest_url: &str,
        asset_name: &str,
        installed: &Utf8Path,
        stderr: &mut dyn Write,
    ) -> Result<VerificationOutcome, ChecksumError> {
        let text = match with_retry(MANIFEST_OPERATION, &self.retry, self.sleeper, stderr, |_| {
            fetch_text(self.fetcher, manifest_url)
        }) {
            Ok(text) => text,
            Err(err) if self.require_checksum => {
                return Err(ChecksumError::Unavailable {
                    url: manifest_url.to_owned(),
                    source: Box::new(err),
                });
            }
            Err(err) => {
                return Ok(self.skip(stderr, format!("checksum file unavailable ({err})")));
            }
        };

        let manifest = parse_manifest(&text);
        debug!("manifest {manifest_url} has {} record(s)", manifest.records().len());
        let Some(expected) = manifest.lookup(asset_name) else {
            if self.require_checksum {
                return Err(ChecksumError::EntryMissing {
                    asset: asset_name.to_owned(),
                    url: manifest_url.to_owned(),
                });
            }
            return Ok(self.skip(stderr, format!("no checksum entry for {asset_name}")));
        };
        let conflicts = manifest.conflicting_digests(asset_name);
        if !conflicts.is_empty() {
            let others: Vec<String> = conflicts.iter().map(ToString::to_string).collect();
            write_stderr_line(
                stderr,
                format!(
                    "Warning: {manifest_url} lists conflicting digests for {asset_name} ({}); verifying against the first entry {expected}",
                    others.join(", ")
                ),
            );
        }

        let actual = compute_sha256(installed.as_std_path()).map_err(|source| {
            ChecksumError::Hash {
                path: installed.to_owned(),
                source,
            }
        })?;
        if &actual != expected {
            return Err(ChecksumError::Mismatch {
                path: installed.to_owned(),
                expected: expected.clone(),
                actual,
            });
        }
        debug!("{installed} matches {actual}");
        Ok(VerificationOutcome::Verified { digest: actual })
    }

    fn skip(&self, stderr: &mut dyn Write, reason: String) -> VerificationOutcome {
        write_stderr_line(
            stderr,
            format!("Warning: {reason}; skipping checksum verification"),
        );
        VerificationOutcome::Skipped { reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artefact::download::{FetchedBody, MockFetcher};
    use crate::retry::MockSleeper;
    use crate::test_utils::{ManifestBuilder, sha256_hex};
    use rstest::{fixture, rstest};
    use std::io::Cursor;
    use std::num::NonZeroU32;
    use std::time::Duration;
    use tempfile::TempDir;

    const ASSET: &str = "codexline-linux-x64";
    const URL: &str = "https://example.test/v1.2.3/SHA256SUMS";
    const BINARY: &[u8] = b"\x7fELF codexline";

    struct Installed {
        _dir: TempDir,
        path: Utf8PathBuf,
    }

    #[fixture]
    fn installed() -> Installed {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("codexline")).expect("utf8");
        std::fs::write(&path, BINARY).expect("write binary");
        Installed { _dir: dir, path }
    }

    fn serving(manifest: String) -> MockFetcher {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().returning(move |_| {
            let body: FetchedBody = Box::new(Cursor::new(manifest.clone().into_bytes()));
            Ok(body)
        });
        fetcher
    }

    fn refusing() -> MockFetcher {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().times(3).returning(|url| {
            Err(FetchError::Transport {
                url: url.to_owned(),
                reason: "connection refused".to_owned(),
            })
        });
        fetcher
    }

    fn napping() -> MockSleeper {
        let mut sleeper = MockSleeper::new();
        sleeper.expect_sleep().return_const(());
        sleeper
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(NonZeroU32::new(3).expect("non-zero"), Duration::from_millis(1))
    }

    fn verify(
        fetcher: &MockFetcher,
        require: bool,
        installed: &Installed,
    ) -> (Result<VerificationOutcome, ChecksumError>, String) {
        let sleeper = napping();
        let verifier = ChecksumVerifier::new(fetcher, &sleeper, policy(), require);
        let mut stderr = Vec::new();
        let result = verifier.verify(URL, ASSET, &installed.path, &mut stderr);
        (result, String::from_utf8(stderr).expect("utf8"))
    }

    #[rstest]
    #[case::lenient(false)]
    #[case::required(true)]
    fn matching_digest_verifies(installed: Installed, #[case] require: bool) {
        let manifest = ManifestBuilder::new().entry(&sha256_hex(BINARY), ASSET).build();

        let (result, _) = verify(&serving(manifest), require, &installed);

        let expected = Sha256Digest::try_from(sha256_hex(BINARY)).expect("digest");
        assert_eq!(
            result.expect("verified"),
            VerificationOutcome::Verified { digest: expected }
        );
    }

    #[rstest]
    fn uppercase_manifest_digest_verifies(installed: Installed) {
        let manifest = ManifestBuilder::new()
            .entry(&sha256_hex(BINARY).to_ascii_uppercase(), ASSET)
            .build();

        let (result, _) = verify(&serving(manifest), true, &installed);

        assert!(matches!(result, Ok(VerificationOutcome::Verified { .. })));
    }

    #[rstest]
    fn single_changed_hex_character_is_a_mismatch(installed: Installed) {
        let good = sha256_hex(BINARY);
        let flipped = if good.starts_with('0') { '1' } else { '0' };
        let bad: String = std::iter::once(flipped).chain(good.chars().skip(1)).collect();
        let manifest = ManifestBuilder::new().entry(&bad, ASSET).build();

        let (result, _) = verify(&serving(manifest), false, &installed);

        let err = result.expect_err("mismatch");
        let message = err.to_string();
        assert!(matches!(err, ChecksumError::Mismatch { .. }));
        assert!(message.contains(&bad), "expected digest missing: {message}");
        assert!(message.contains(&good), "actual digest missing: {message}");
    }

    #[rstest]
    fn unavailable_manifest_fails_when_required(installed: Installed) {
        let (result, stderr) = verify(&refusing(), true, &installed);

        let err = result.expect_err("required");
        assert!(err.to_string().contains("checksum file unavailable"));
        assert_eq!(stderr.matches("Warning: checksum manifest download failed").count(), 2);
    }

    #[rstest]
    fn unavailable_manifest_is_skipped_when_lenient(installed: Installed) {
        let (result, stderr) = verify(&refusing(), false, &installed);

        assert!(matches!(result, Ok(VerificationOutcome::Skipped { .. })));
        assert!(stderr.contains("skipping checksum verification"));
    }

    #[rstest]
    #[case::required(true, false)]
    #[case::lenient(false, true)]
    fn missing_entry_follows_policy(
        installed: Installed,
        #[case] require: bool,
        #[case] expect_skip: bool,
    ) {
        let manifest = ManifestBuilder::new()
            .entry(&sha256_hex(b"other"), "codexline-darwin-arm64")
            .build();

        let (result, _) = verify(&serving(manifest), require, &installed);

        match result {
            Ok(VerificationOutcome::Skipped { reason }) => {
                assert!(expect_skip);
                assert!(reason.contains(ASSET));
            }
            Err(ChecksumError::EntryMissing { asset, .. }) => {
                assert!(!expect_skip);
                assert_eq!(asset, ASSET);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[rstest]
    fn conflicting_entries_are_flagged_and_first_wins(installed: Installed) {
        let good = sha256_hex(BINARY);
        let other = sha256_hex(b"other build");
        let manifest = ManifestBuilder::new()
            .entry(&good, ASSET)
            .entry(&other, &format!("mirror/{ASSET}"))
            .build();

        let (result, stderr) = verify(&serving(manifest), true, &installed);

        assert!(matches!(result, Ok(VerificationOutcome::Verified { .. })));
        assert!(stderr.contains("conflicting digests"), "{stderr}");
        assert!(stderr.contains(&other), "{stderr}");
    }

    #[rstest]
    fn path_qualified_entry_matches_by_basename(installed: Installed) {
        let manifest = ManifestBuilder::new()
            .binary_entry(&sha256_hex(BINARY), &format!("subdir/{ASSET}"))
            .build();

        let (result, _) = verify(&serving(manifest), true, &installed);

        assert!(matches!(result, Ok(VerificationOutcome::Verified { .. })));
    }
}
