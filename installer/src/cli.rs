//! CLI argument definitions for the codexline installer.
//!
//! Every setting can also come from a `CODEXLINE_*` environment variable
//! (see [`crate::config`]). A flag given on the command line always wins
//! over the environment.

use camino::Utf8PathBuf;
use clap::Parser;
use std::num::{NonZeroU32, NonZeroU64};

/// Download, verify, and install the prebuilt codexline binary.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "codexline-install")]
#[command(version, about)]
#[command(long_about = concat!(
    "Download, verify, and install the prebuilt codexline binary.\n\n",
    "The installer picks the release asset for this host, downloads it with ",
    "retries, checks it against the release's SHA256SUMS manifest, and ",
    "atomically moves it into the output directory.\n\n",
    "Hosts without a published binary are skipped with a warning and exit 0.",
))]
#[command(after_help = concat!(
    "ENVIRONMENT:\n",
    "  CODEXLINE_SKIP_DOWNLOAD        Skip the install entirely (1/0, true/false, yes/no, on/off)\n",
    "  CODEXLINE_VERSION              Release version, e.g. v0.4.2\n",
    "  CODEXLINE_BASE_URL             Release download prefix\n",
    "  CODEXLINE_DOWNLOAD_RETRIES     Attempts per download (default 3)\n",
    "  CODEXLINE_DOWNLOAD_TIMEOUT_MS  Inactivity timeout (default 20000)\n",
    "  CODEXLINE_VERIFY_CHECKSUM      Verify against SHA256SUMS (default on)\n",
    "  CODEXLINE_REQUIRE_CHECKSUM     Fail when SHA256SUMS or its entry is missing\n",
    "  CODEXLINE_INSTALL_DIR          Output directory\n",
    "  CODEXLINE_PLATFORM             Override detected OS (linux, darwin, win32)\n",
    "  CODEXLINE_ARCH                 Override detected architecture (x64, arm64)\n",
    "  RUST_LOG                       Diagnostic log filter\n\n",
    "EXAMPLES:\n",
    "  Install the release matching this installer:\n",
    "    $ codexline-install\n\n",
    "  Install a specific release into ~/bin, failing without a checksum:\n",
    "    $ codexline-install --release-version v0.5.0 -o ~/bin --require-checksum\n\n",
    "  Preview what would be downloaded:\n",
    "    $ codexline-install --dry-run --platform darwin --arch arm64",
))]
pub struct Cli {
    /// Skip the download and exit successfully.
    #[arg(long)]
    pub skip_download: bool,

    /// Release version to install [default: this installer's version].
    #[arg(long, value_name = "VERSION")]
    pub release_version: Option<String>,

    /// Release download prefix.
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Attempts per download, including the first.
    #[arg(long, value_name = "N")]
    pub retries: Option<NonZeroU32>,

    /// Network inactivity timeout in milliseconds.
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<NonZeroU64>,

    /// Do not verify the binary against the checksum manifest.
    #[arg(long, conflicts_with = "require_checksum")]
    pub no_verify: bool,

    /// Fail when the checksum manifest or its entry is missing.
    #[arg(long)]
    pub require_checksum: bool,

    /// Directory to install into [default: platform-specific].
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<Utf8PathBuf>,

    /// Override the detected operating system.
    #[arg(long, value_name = "OS")]
    pub platform: Option<String>,

    /// Override the detected architecture.
    #[arg(long, value_name = "ARCH")]
    pub arch: Option<String>,

    /// Show what would be installed and exit without downloading.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase diagnostic log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (warnings and errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Log level filter for the given `-v` count.
    ///
    /// # Examples
    ///
    /// ```
    /// use codexline_installer::cli::Cli;
    ///
    /// let cli = Cli { verbosity: 2, ..Cli::default() };
    /// assert_eq!(cli.log_level(), log::LevelFilter::Debug);
    /// ```
    #[must_use]
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
