//! Platform resolution for prebuilt codexline binaries.
//!
//! Only five (os, arch) pairs have a published binary. Any other pair
//! resolves to `None`; callers treat that as a soft skip rather than an
//! error so automated installs on unusual hosts keep working.

use std::fmt;

/// One row of the published-binary matrix.
struct TargetEntry {
    os: &'static str,
    arch: &'static str,
    target: Target,
}

const TARGET_TABLE: &[TargetEntry] = &[
    TargetEntry {
        os: "win32",
        arch: "x64",
        target: Target::new("codexline-win32-x64.exe", "codexline.exe"),
    },
    TargetEntry {
        os: "linux",
        arch: "x64",
        target: Target::new("codexline-linux-x64", "codexline"),
    },
    TargetEntry {
        os: "linux",
        arch: "arm64",
        target: Target::new("codexline-linux-arm64", "codexline"),
    },
    TargetEntry {
        os: "darwin",
        arch: "x64",
        target: Target::new("codexline-darwin-x64", "codexline"),
    },
    TargetEntry {
        os: "darwin",
        arch: "arm64",
        target: Target::new("codexline-darwin-arm64", "codexline"),
    },
];

/// A published binary: the release asset to fetch and the local filename to
/// install it under.
///
/// # Examples
///
/// ```
/// use codexline_installer::artefact::target::{HostPlatform, resolve_target};
///
/// let target = resolve_target(&HostPlatform::new("linux", "x64")).expect("supported");
/// assert_eq!(target.asset_name(), "codexline-linux-x64");
/// assert_eq!(target.output_name(), "codexline");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    asset_name: &'static str,
    output_name: &'static str,
}

impl Target {
    const fn new(asset_name: &'static str, output_name: &'static str) -> Self {
        Self {
            asset_name,
            output_name,
        }
    }

    /// Release asset name, e.g. `codexline-darwin-arm64`.
    #[must_use]
    pub const fn asset_name(&self) -> &'static str {
        self.asset_name
    }

    /// Installed filename, e.g. `codexline` or `codexline.exe`.
    #[must_use]
    pub const fn output_name(&self) -> &'static str {
        self.output_name
    }

    /// Whether this binary targets Windows, where no mode bits are applied.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.output_name.ends_with(".exe")
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.asset_name)
    }
}

/// An operating-system/architecture pair in canonical release naming
/// (`linux`, `darwin`, `win32`; `x64`, `arm64`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPlatform {
    os: String,
    arch: String,
}

impl HostPlatform {
    /// Build a platform from identifiers, canonicalising Rust's spellings.
    ///
    /// `macos`/`windows` and `x86_64`/`aarch64` map to the release names;
    /// anything else is kept verbatim.
    ///
    /// ```
    /// use codexline_installer::artefact::target::HostPlatform;
    ///
    /// let platform = HostPlatform::new("macos", "aarch64");
    /// assert_eq!(platform.to_string(), "darwin/arm64");
    /// ```
    #[must_use]
    pub fn new(os: &str, arch: &str) -> Self {
        Self {
            os: canonical_os(os).to_owned(),
            arch: canonical_arch(arch).to_owned(),
        }
    }

    /// The platform this installer was compiled for.
    #[must_use]
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Canonical operating-system identifier.
    #[must_use]
    pub fn os(&self) -> &str {
        &self.os
    }

    /// Canonical architecture identifier.
    #[must_use]
    pub fn arch(&self) -> &str {
        &self.arch
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// Look up the published binary for `platform`.
///
/// Returns `None` for any pair outside the published matrix. There is no
/// fallback across architectures.
#[must_use]
pub fn resolve_target(platform: &HostPlatform) -> Option<Target> {
    TARGET_TABLE
        .iter()
        .find(|entry| entry.os == platform.os() && entry.arch == platform.arch())
        .map(|entry| entry.target)
}

/// Every (os, arch) pair with a published binary, in table order.
pub fn supported_platforms() -> impl Iterator<Item = (&'static str, &'static str)> {
    TARGET_TABLE.iter().map(|entry| (entry.os, entry.arch))
}

fn canonical_os(os: &str) -> &str {
    match os {
        "windows" => "win32",
        "macos" => "darwin",
        other => other,
    }
}

fn canonical_arch(arch: &str) -> &str {
    match arch {
        "x86_64" | "amd64" => "x64",
        "aarch64" => "arm64",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn every_supported_pair_resolves() {
        for (os, arch) in supported_platforms() {
            let target = resolve_target(&HostPlatform::new(os, arch));
            assert!(target.is_some(), "expected {os}/{arch} to resolve");
        }
    }

    #[test]
    fn matrix_has_five_entries() {
        assert_eq!(supported_platforms().count(), 5);
    }

    #[rstest]
    #[case::windows("win32", "x64", "codexline-win32-x64.exe", "codexline.exe")]
    #[case::linux_x64("linux", "x64", "codexline-linux-x64", "codexline")]
    #[case::linux_arm("linux", "arm64", "codexline-linux-arm64", "codexline")]
    #[case::macos_x64("darwin", "x64", "codexline-darwin-x64", "codexline")]
    #[case::macos_arm("darwin", "arm64", "codexline-darwin-arm64", "codexline")]
    fn resolves_expected_names(
        #[case] os: &str,
        #[case] arch: &str,
        #[case] asset: &str,
        #[case] output: &str,
    ) {
        let target = resolve_target(&HostPlatform::new(os, arch)).expect("supported pair");
        assert_eq!(target.asset_name(), asset);
        assert_eq!(target.output_name(), output);
    }

    #[rstest]
    #[case::freebsd("freebsd", "x64")]
    #[case::windows_arm("win32", "arm64")]
    #[case::linux_ia32("linux", "ia32")]
    #[case::empty("", "")]
    fn unlisted_pairs_are_unsupported(#[case] os: &str, #[case] arch: &str) {
        assert_eq!(resolve_target(&HostPlatform::new(os, arch)), None);
    }

    #[rstest]
    #[case::rust_linux("linux", "x86_64", "linux/x64")]
    #[case::rust_macos("macos", "aarch64", "darwin/arm64")]
    #[case::rust_windows("windows", "x86_64", "win32/x64")]
    #[case::passthrough("freebsd", "riscv64", "freebsd/riscv64")]
    fn canonicalises_rust_identifiers(#[case] os: &str, #[case] arch: &str, #[case] shown: &str) {
        assert_eq!(HostPlatform::new(os, arch).to_string(), shown);
    }

    #[test]
    fn only_the_windows_target_is_windows() {
        let windows: Vec<_> = supported_platforms()
            .filter_map(|(os, arch)| resolve_target(&HostPlatform::new(os, arch)))
            .filter(Target::is_windows)
            .collect();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].asset_name(), "codexline-win32-x64.exe");
    }
}
