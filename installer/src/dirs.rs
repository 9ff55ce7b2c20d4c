//! Platform directory lookup behind a mockable trait.
//!
//! Production code uses [`SystemBaseDirs`], which asks `directories-next`
//! for the per-user local data directory. Tests substitute `MockBaseDirs`.

use std::path::PathBuf;

/// Application name used for platform directories.
pub const APPLICATION: &str = "codexline";

/// Source of per-user directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// Per-user local data directory for codexline, if the platform has one.
    ///
    /// On Linux this is typically `~/.local/share/codexline`, on macOS
    /// `~/Library/Application Support/codexline`, and on Windows
    /// `%LOCALAPPDATA%\codexline\data`.
    fn codexline_data_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by the host platform's conventions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBaseDirs;

impl BaseDirs for SystemBaseDirs {
    fn codexline_data_dir(&self) -> Option<PathBuf> {
        directories_next::ProjectDirs::from("", "", APPLICATION)
            .map(|dirs| dirs.data_local_dir().to_path_buf())
    }
}
