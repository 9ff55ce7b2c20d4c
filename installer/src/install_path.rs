//! Where the codexline binary lives once installed.
//!
//! The command dispatcher and the service scripts look for the binary at
//! [`installed_binary_path`]; the installer writes it there.

use camino::{Utf8Path, Utf8PathBuf};

use crate::artefact::target::Target;
use crate::config::ConfigError;
use crate::dirs::BaseDirs;

/// Default output directory: `<codexline data dir>/bin`.
///
/// # Errors
///
/// Returns [`ConfigError::NoDataDir`] when the platform data directory
/// cannot be determined or is not valid UTF-8.
pub fn default_install_dir(dirs: &dyn BaseDirs) -> Result<Utf8PathBuf, ConfigError> {
    let base_dir = dirs.codexline_data_dir().ok_or_else(|| ConfigError::NoDataDir {
        reason: "could not determine codexline data directory".to_owned(),
    })?;
    let base_dir = Utf8PathBuf::from_path_buf(base_dir).map_err(|path| ConfigError::NoDataDir {
        reason: format!(
            "codexline data directory is not valid UTF-8: {}",
            path.display()
        ),
    })?;
    Ok(base_dir.join("bin"))
}

/// Full path of the installed binary for `target` inside `install_dir`.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use codexline_installer::artefact::target::{HostPlatform, resolve_target};
/// use codexline_installer::install_path::installed_binary_path;
///
/// let target = resolve_target(&HostPlatform::new("win32", "x64")).expect("supported");
/// let path = installed_binary_path(Utf8Path::new("C:/tools"), &target);
/// assert_eq!(path, Utf8Path::new("C:/tools/codexline.exe"));
/// ```
#[must_use]
pub fn installed_binary_path(install_dir: &Utf8Path, target: &Target) -> Utf8PathBuf {
    install_dir.join(target.output_name())
}
