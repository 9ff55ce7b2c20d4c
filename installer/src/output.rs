//! User-facing output for the installer CLI.
//!
//! Progress, warnings, and the final status line all go to an injected
//! writer (stderr in production) so tests can capture them. Diagnostics
//! belong to the `log` facade instead.

use camino::Utf8Path;
use std::fmt::Display;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Format the single-line confirmation printed after a successful install.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use codexline_installer::output::success_message;
///
/// let line = success_message(Utf8Path::new("/opt/codexline/bin/codexline"));
/// assert_eq!(line, "codexline installed: /opt/codexline/bin/codexline");
/// ```
#[must_use]
pub fn success_message(path: &Utf8Path) -> String {
    format!("codexline installed: {path}")
}

/// Format the single-line report for a failed install.
#[must_use]
pub fn failure_message(stage: impl Display, cause: impl Display) -> String {
    format!("codexline install failed during {stage}: {cause}")
}

/// What an install would do, shown by `--dry-run`.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use codexline_installer::output::DryRunInfo;
///
/// let info = DryRunInfo {
///     platform: "linux/x64",
///     asset: "codexline-linux-x64",
///     binary_url: "https://example.test/v1.0.0/codexline-linux-x64",
///     manifest_url: "https://example.test/v1.0.0/SHA256SUMS",
///     output_path: Utf8Path::new("/home/user/.local/share/codexline/bin/codexline"),
///     attempts: 3,
///     timeout_ms: 20_000,
///     verification: "checksum verification enabled (lenient)",
/// };
///
/// let output = info.display_text();
/// assert!(output.contains("Dry run"));
/// assert!(output.contains("codexline-linux-x64"));
/// ```
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// Canonical `os/arch` identifier of the target host.
    pub platform: &'a str,
    /// Release asset that would be downloaded.
    pub asset: &'a str,
    /// URL of the binary.
    pub binary_url: &'a str,
    /// URL of the checksum manifest.
    pub manifest_url: &'a str,
    /// Where the binary would be installed.
    pub output_path: &'a Utf8Path,
    /// Download attempts per operation.
    pub attempts: u32,
    /// Network inactivity timeout in milliseconds.
    pub timeout_ms: u128,
    /// Description of the checksum policy.
    pub verification: &'a str,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        [
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Platform: {}", self.platform),
            format!("Asset: {}", self.asset),
            format!("Binary URL: {}", self.binary_url),
            format!("Checksum manifest URL: {}", self.manifest_url),
            format!("Output path: {}", self.output_path),
            format!("Download attempts: {}", self.attempts),
            format!("Request timeout: {} ms", self.timeout_ms),
            format!("Verification: {}", self.verification),
        ]
        .join("\n")
    }
}
