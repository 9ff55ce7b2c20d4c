//! Installer configuration from the environment and the command line.
//!
//! The environment is read once, into [`EnvSettings`]. It is then merged
//! with the parsed [`Cli`] into an immutable [`InstallConfig`] that is passed
//! explicitly to the install pipeline. The skip switch alone can be read
//! ahead of that with [`skip_requested_by`], so a skipped run never fails on
//! an unrelated malformed variable. Command-line flags take
//! precedence over environment variables, which take precedence over
//! defaults.

use camino::Utf8PathBuf;
use std::num::{NonZeroU32, NonZeroU64};
use std::time::Duration;

use crate::artefact::download::FetchOptions;
use crate::artefact::error::ArtefactError;
use crate::artefact::release::{DEFAULT_BASE_URL, ReleaseLocation};
use crate::artefact::target::HostPlatform;
use crate::artefact::verification::VerificationPolicy;
use crate::cli::Cli;
use crate::dirs::BaseDirs;
use crate::install_path::default_install_dir;
use crate::retry::RetryPolicy;

/// Skip the install entirely.
pub const ENV_SKIP_DOWNLOAD: &str = "CODEXLINE_SKIP_DOWNLOAD";
/// Release version override.
pub const ENV_VERSION: &str = "CODEXLINE_VERSION";
/// Release base URL override.
pub const ENV_BASE_URL: &str = "CODEXLINE_BASE_URL";
/// Attempts per download.
pub const ENV_DOWNLOAD_RETRIES: &str = "CODEXLINE_DOWNLOAD_RETRIES";
/// Network inactivity timeout in milliseconds.
pub const ENV_DOWNLOAD_TIMEOUT_MS: &str = "CODEXLINE_DOWNLOAD_TIMEOUT_MS";
/// Enable or disable checksum verification.
pub const ENV_VERIFY_CHECKSUM: &str = "CODEXLINE_VERIFY_CHECKSUM";
/// Treat a missing manifest or entry as fatal.
pub const ENV_REQUIRE_CHECKSUM: &str = "CODEXLINE_REQUIRE_CHECKSUM";
/// Output directory override.
pub const ENV_INSTALL_DIR: &str = "CODEXLINE_INSTALL_DIR";
/// Operating system override.
pub const ENV_PLATFORM: &str = "CODEXLINE_PLATFORM";
/// Architecture override.
pub const ENV_ARCH: &str = "CODEXLINE_ARCH";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A boolean variable holds an unrecognised word.
    #[error("{name} must be one of 1/0, true/false, yes/no, on/off; got \"{value}\"")]
    InvalidBool {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },

    /// A numeric variable is not a positive integer.
    #[error("{name} must be a positive integer; got \"{value}\"")]
    InvalidNumber {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },

    /// The release version or base URL is unusable.
    #[error(transparent)]
    Release(#[from] ArtefactError),

    /// No default output directory could be determined.
    #[error("no default install directory: {reason}; set CODEXLINE_INSTALL_DIR or --output-dir")]
    NoDataDir {
        /// Why the lookup failed.
        reason: String,
    },
}

/// Values read from `CODEXLINE_*` environment variables.
///
/// Unset and empty variables are both `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSettings {
    /// `CODEXLINE_SKIP_DOWNLOAD`.
    pub skip_download: Option<bool>,
    /// `CODEXLINE_VERSION`.
    pub version: Option<String>,
    /// `CODEXLINE_BASE_URL`.
    pub base_url: Option<String>,
    /// `CODEXLINE_DOWNLOAD_RETRIES`.
    pub retries: Option<NonZeroU32>,
    /// `CODEXLINE_DOWNLOAD_TIMEOUT_MS`.
    pub timeout_ms: Option<NonZeroU64>,
    /// `CODEXLINE_VERIFY_CHECKSUM`.
    pub verify_checksum: Option<bool>,
    /// `CODEXLINE_REQUIRE_CHECKSUM`.
    pub require_checksum: Option<bool>,
    /// `CODEXLINE_INSTALL_DIR`.
    pub install_dir: Option<Utf8PathBuf>,
    /// `CODEXLINE_PLATFORM`.
    pub platform: Option<String>,
    /// `CODEXLINE_ARCH`.
    pub arch: Option<String>,
}

impl EnvSettings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    ///
    /// See [`EnvSettings::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBool`] or [`ConfigError::InvalidNumber`]
    /// for malformed values.
    ///
    /// # Examples
    ///
    /// ```
    /// use codexline_installer::config::EnvSettings;
    ///
    /// let settings = EnvSettings::from_lookup(|name| match name {
    ///     "CODEXLINE_REQUIRE_CHECKSUM" => Some("yes".to_owned()),
    ///     "CODEXLINE_VERSION" => Some(String::new()),
    ///     _ => None,
    /// })
    /// .expect("valid settings");
    /// assert_eq!(settings.require_checksum, Some(true));
    /// assert_eq!(settings.version, None);
    /// ```
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| read_var(&lookup, name);
        Ok(Self {
            skip_download: skip_from_lookup(&lookup)?,
            version: get(ENV_VERSION),
            base_url: get(ENV_BASE_URL),
            retries: get(ENV_DOWNLOAD_RETRIES)
                .map(|v| parse_positive(ENV_DOWNLOAD_RETRIES, &v))
                .transpose()?,
            timeout_ms: get(ENV_DOWNLOAD_TIMEOUT_MS)
                .map(|v| parse_positive(ENV_DOWNLOAD_TIMEOUT_MS, &v))
                .transpose()?,
            verify_checksum: get(ENV_VERIFY_CHECKSUM)
                .map(|v| parse_bool(ENV_VERIFY_CHECKSUM, &v))
                .transpose()?,
            require_checksum: get(ENV_REQUIRE_CHECKSUM)
                .map(|v| parse_bool(ENV_REQUIRE_CHECKSUM, &v))
                .transpose()?,
            install_dir: get(ENV_INSTALL_DIR).map(Utf8PathBuf::from),
            platform: get(ENV_PLATFORM),
            arch: get(ENV_ARCH),
        })
    }
}

/// Whether the install should be skipped, from the flag or the environment.
#[must_use]
pub fn skip_requested(cli: &Cli, env: &EnvSettings) -> bool {
    cli.skip_download || env.skip_download.unwrap_or(false)
}

/// Decide the skip switch before any other variable is parsed.
///
/// `--skip-download` wins outright. Otherwise only `CODEXLINE_SKIP_DOWNLOAD`
/// is read through `lookup`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBool`] when the flag is absent and
/// `CODEXLINE_SKIP_DOWNLOAD` holds an unrecognised word.
///
/// # Examples
///
/// ```
/// use codexline_installer::cli::Cli;
/// use codexline_installer::config::skip_requested_by;
///
/// let skip = skip_requested_by(&Cli::default(), |name| match name {
///     "CODEXLINE_SKIP_DOWNLOAD" => Some("on".to_owned()),
///     _ => Some("not parsed".to_owned()),
/// })
/// .expect("valid skip value");
/// assert!(skip);
/// ```
pub fn skip_requested_by(
    cli: &Cli,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<bool, ConfigError> {
    if cli.skip_download {
        return Ok(true);
    }
    Ok(skip_from_lookup(&lookup)?.unwrap_or(false))
}

fn skip_from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Option<bool>, ConfigError> {
    read_var(lookup, ENV_SKIP_DOWNLOAD)
        .map(|v| parse_bool(ENV_SKIP_DOWNLOAD, &v))
        .transpose()
}

fn read_var(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Everything one install run needs, resolved up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallConfig {
    /// Bypass the pipeline entirely.
    pub skip_download: bool,
    /// Where the release lives.
    pub release: ReleaseLocation,
    /// Host to install for.
    pub platform: HostPlatform,
    /// Output directory for the binary.
    pub install_dir: Utf8PathBuf,
    /// Retry budget for each download.
    pub retry: RetryPolicy,
    /// Timeout and redirect limits per request.
    pub fetch: FetchOptions,
    /// Checksum verification switches.
    pub verification: VerificationPolicy,
    /// Report the plan without downloading.
    pub dry_run: bool,
    /// Suppress progress output.
    pub quiet: bool,
}

impl InstallConfig {
    /// Merge command-line flags over environment settings over defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the release location is invalid or no output
    /// directory is configured and the platform default cannot be found.
    pub fn resolve(
        cli: &Cli,
        env: &EnvSettings,
        dirs: &dyn BaseDirs,
    ) -> Result<Self, ConfigError> {
        let version = cli
            .release_version
            .clone()
            .or_else(|| env.version.clone())
            .unwrap_or_else(ReleaseLocation::default_version);
        let base_url = cli
            .base_url
            .clone()
            .or_else(|| env.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let release = ReleaseLocation::new(version, base_url)?;

        let detected = HostPlatform::current();
        let os = cli.platform.as_deref().or(env.platform.as_deref());
        let arch = cli.arch.as_deref().or(env.arch.as_deref());
        let platform = HostPlatform::new(
            os.unwrap_or_else(|| detected.os()),
            arch.unwrap_or_else(|| detected.arch()),
        );

        let install_dir = match cli.output_dir.clone().or_else(|| env.install_dir.clone()) {
            Some(dir) => dir,
            None => default_install_dir(dirs)?,
        };

        let retry = RetryPolicy::default();
        let retry = RetryPolicy::new(
            cli.retries.or(env.retries).unwrap_or(retry.attempts()),
            retry.base_delay(),
        );

        let timeout = cli
            .timeout_ms
            .or(env.timeout_ms)
            .map_or(FetchOptions::default().timeout, |ms| {
                Duration::from_millis(ms.get())
            });
        let fetch = FetchOptions {
            timeout,
            ..FetchOptions::default()
        };

        let verify = !cli.no_verify && env.verify_checksum.unwrap_or(true);
        let require = cli.require_checksum || env.require_checksum.unwrap_or(false);

        Ok(Self {
            skip_download: skip_requested(cli, env),
            release,
            platform,
            install_dir,
            retry,
            fetch,
            verification: VerificationPolicy::new(verify, require),
            dry_run: cli.dry_run,
            quiet: cli.quiet,
        })
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            name,
            value: value.to_owned(),
        }),
    }
}

fn parse_positive<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        name,
        value: value.to_owned(),
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
