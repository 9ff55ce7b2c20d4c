//! Install orchestration: resolve, download, verify, finalize.
//!
//! [`run_install`] wires the production fetcher and sleeper into
//! [`run_install_with`], which tests drive with scripted collaborators.
//! A failed download or verification removes both the final and the staging
//! path before the error is returned, so a failed run never leaves a binary
//! behind.

use camino::Utf8PathBuf;
use log::{debug, info, warn};
use std::io::Write;

use crate::artefact::download::{FetchError, Fetcher, HttpFetcher};
use crate::artefact::target::{HostPlatform, Target, resolve_target};
use crate::checksum::{ChecksumVerifier, VerificationOutcome};
use crate::config::InstallConfig;
use crate::error::{InstallerError, Result};
use crate::install_path::installed_binary_path;
use crate::output::{DryRunInfo, success_message, write_stderr_line};
use crate::permissions::make_executable;
use crate::retry::{Sleeper, ThreadSleeper, with_retry};
use crate::stager::{Stager, StagingError};

/// Terminal state of a run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The binary was downloaded and installed.
    Installed {
        /// Installed binary path.
        path: Utf8PathBuf,
        /// The release asset that was installed.
        target: Target,
        /// Result of checksum verification, if it ran.
        verification: Option<VerificationOutcome>,
    },
    /// Skipped on request.
    Skipped,
    /// No binary is published for this host.
    UnsupportedPlatform {
        /// The host that has no binary.
        platform: HostPlatform,
    },
    /// Dry run; nothing was downloaded.
    DryRun {
        /// URL that would be downloaded.
        binary_url: String,
        /// Where the binary would be installed.
        path: Utf8PathBuf,
    },
}

/// Why a single download attempt failed. Both kinds are retried.
#[derive(Debug, thiserror::Error)]
pub enum DownloadAttemptError {
    /// The request itself failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The response stream broke while being written.
    #[error(transparent)]
    Stream(StagingError),
}

/// Bytes written, a filesystem failure that must not be retried, or a
/// retryable attempt error.
type AttemptResult =
    std::result::Result<std::result::Result<u64, StagingError>, DownloadAttemptError>;

/// Install using the HTTP fetcher and real sleeps.
///
/// # Errors
///
/// See [`run_install_with`].
pub fn run_install(config: &InstallConfig, stderr: &mut dyn Write) -> Result<InstallOutcome> {
    let fetcher = HttpFetcher::new(config.fetch);
    run_install_with(config, &fetcher, &ThreadSleeper, stderr)
}

/// Install with injected collaborators.
///
/// Public so integration tests can script the network.
///
/// # Errors
///
/// Returns an [`InstallerError`] when the output directory cannot be
/// created, every download attempt fails, the filesystem rejects the staged
/// file, verification fails, or permissions cannot be applied.
pub fn run_install_with(
    config: &InstallConfig,
    fetcher: &dyn Fetcher,
    sleeper: &dyn Sleeper,
    stderr: &mut dyn Write,
) -> Result<InstallOutcome> {
    if config.skip_download {
        info!("download skipped by configuration");
        progress(config, stderr, "codexline download skipped");
        return Ok(InstallOutcome::Skipped);
    }

    let Some(target) = resolve_target(&config.platform) else {
        write_stderr_line(
            stderr,
            format!(
                "Warning: no prebuilt codexline binary for {}; skipping install",
                config.platform
            ),
        );
        return Ok(InstallOutcome::UnsupportedPlatform {
            platform: config.platform.clone(),
        });
    };

    let path = installed_binary_path(&config.install_dir, &target);
    let binary_url = config.release.binary_url(&target);
    if config.dry_run {
        print_dry_run(config, &target, &binary_url, stderr);
        return Ok(InstallOutcome::DryRun { binary_url, path });
    }

    std::fs::create_dir_all(&config.install_dir).map_err(|source| {
        InstallerError::OutputDir {
            path: config.install_dir.clone(),
            source,
        }
    })?;

    let stager = Stager::new(&path);
    let verification = match download_and_verify(
        config,
        &target,
        &binary_url,
        &stager,
        fetcher,
        sleeper,
        stderr,
    ) {
        Ok(verification) => verification,
        Err(err) => {
            discard(&stager);
            return Err(err);
        }
    };

    if !target.is_windows() {
        make_executable(&path).map_err(|source| InstallerError::Permissions {
            path: path.clone(),
            source,
        })?;
    }
    progress(config, stderr, success_message(&path));

    Ok(InstallOutcome::Installed {
        path,
        target,
        verification,
    })
}

fn download_and_verify(
    config: &InstallConfig,
    target: &Target,
    binary_url: &str,
    stager: &Stager,
    fetcher: &dyn Fetcher,
    sleeper: &dyn Sleeper,
    stderr: &mut dyn Write,
) -> Result<Option<VerificationOutcome>> {
    progress(config, stderr, format!("Downloading {binary_url}..."));
    let operation = format!("download of {}", target.asset_name());
    // Filesystem failures come back as `Ok(Err(_))` so they escape the
    // retry loop on the first occurrence.
    let attempt = with_retry(
        &operation,
        &config.retry,
        sleeper,
        stderr,
        |_| -> AttemptResult {
            let mut body = fetcher.fetch(binary_url)?;
            match stager.install(&mut *body) {
                Ok(bytes) => Ok(Ok(bytes)),
                Err(err) if err.is_stream_error() => Err(stream_failure(err)),
                Err(err) => Ok(Err(err)),
            }
        },
    )?;
    let bytes = attempt?;
    debug!("downloaded {bytes} bytes to {}", stager.final_path());

    if !config.verification.verify() {
        info!("checksum verification disabled");
        return Ok(None);
    }
    progress(config, stderr, "Verifying checksum...");
    let verifier = ChecksumVerifier::new(
        fetcher,
        sleeper,
        config.retry,
        config.verification.require_checksum(),
    );
    let outcome = verifier.verify(
        &config.release.manifest_url(),
        target.asset_name(),
        stager.final_path(),
        stderr,
    )?;
    Ok(Some(outcome))
}

/// A body that stalled surfaces as the fetch timeout it carries.
fn stream_failure(err: StagingError) -> DownloadAttemptError {
    match err {
        StagingError::Read { source } => match FetchError::from_body_error(source) {
            Ok(fetch) => DownloadAttemptError::Fetch(fetch),
            Err(source) => DownloadAttemptError::Stream(StagingError::Read { source }),
        },
        other => DownloadAttemptError::Stream(other),
    }
}

fn print_dry_run(
    config: &InstallConfig,
    target: &Target,
    binary_url: &str,
    stderr: &mut dyn Write,
) {
    let platform = config.platform.to_string();
    let manifest_url = config.release.manifest_url();
    let output_path = installed_binary_path(&config.install_dir, target);
    let verification = config.verification.to_string();
    let info = DryRunInfo {
        platform: &platform,
        asset: target.asset_name(),
        binary_url,
        manifest_url: &manifest_url,
        output_path: &output_path,
        attempts: config.retry.attempts().get(),
        timeout_ms: config.fetch.timeout.as_millis(),
        verification: &verification,
    };
    write_stderr_line(stderr, info.display_text());
}

fn discard(stager: &Stager) {
    if let Err(err) = stager.discard() {
        warn!("failed to clean up {}: {err}", stager.final_path());
    }
}

fn progress(config: &InstallConfig, stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if !config.quiet {
        write_stderr_line(stderr, message);
    }
}

#[cfg(test)]
#[path = "install_tests.rs"]
mod tests;
