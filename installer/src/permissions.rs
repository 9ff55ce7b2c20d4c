//! Executable permission normalisation for the installed binary.

use camino::Utf8Path;
use std::io;

/// Mode applied to installed binaries on Unix (`rwxr-xr-x`).
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Set [`EXECUTABLE_MODE`] on `path`.
///
/// A no-op on hosts without Unix permission bits.
///
/// # Errors
///
/// Returns an error if the file metadata cannot be read or the mode cannot
/// be changed.
#[cfg(unix)]
pub fn make_executable(path: &Utf8Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(EXECUTABLE_MODE);
    std::fs::set_permissions(path, perms)
}

/// Set [`EXECUTABLE_MODE`] on `path`.
///
/// A no-op on hosts without Unix permission bits.
///
/// # Errors
///
/// Never fails on this platform.
#[cfg(not(unix))]
pub fn make_executable(path: &Utf8Path) -> io::Result<()> {
    log::debug!("no permission bits to set on {path}");
    Ok(())
}
