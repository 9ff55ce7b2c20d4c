//! Atomic installation of a downloaded byte stream.
//!
//! The stream is written to `<final>.tmp` beside the destination and only
//! renamed over the final path once every byte has been written and synced.
//! A guard removes the staging file on every early exit, so the final path
//! never holds a partial binary.

use camino::{Utf8Path, Utf8PathBuf};
use log::{trace, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};

/// Suffix appended to the final path to form the staging path.
pub const STAGING_SUFFIX: &str = ".tmp";

const COPY_BUFFER_LEN: usize = 64 * 1024;

/// Errors from staging and promoting a downloaded binary.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    /// Reading the source stream failed part-way.
    #[error("download stream interrupted: {source}")]
    Read {
        /// The underlying read error.
        #[source]
        source: io::Error,
    },

    /// Creating, writing, or syncing the staging file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The staging file path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Replacing the final path with the staging file failed.
    #[error("failed to move {from} to {to}: {source}")]
    Promote {
        /// The staging file path.
        from: Utf8PathBuf,
        /// The final path.
        to: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl StagingError {
    /// Whether the failure came from the source stream rather than the
    /// local filesystem.
    #[must_use]
    pub fn is_stream_error(&self) -> bool {
        matches!(self, Self::Read { .. })
    }
}

/// Stages a stream beside `final_path` and promotes it atomically.
#[derive(Debug, Clone)]
pub struct Stager {
    final_path: Utf8PathBuf,
    staging_path: Utf8PathBuf,
}

impl Stager {
    /// Create a stager for the given destination.
    #[must_use]
    pub fn new(final_path: impl Into<Utf8PathBuf>) -> Self {
        let final_path = final_path.into();
        let staging_path = Utf8PathBuf::from(format!("{final_path}{STAGING_SUFFIX}"));
        Self {
            final_path,
            staging_path,
        }
    }

    /// Destination of the installed binary.
    #[must_use]
    pub fn final_path(&self) -> &Utf8Path {
        &self.final_path
    }

    /// Temporary path used while the stream is being written.
    #[must_use]
    pub fn staging_path(&self) -> &Utf8Path {
        &self.staging_path
    }

    /// Copy `reader` to the staging path, then rename it over the final path.
    ///
    /// Any stale staging file is removed first. On success the number of
    /// bytes written is returned.
    ///
    /// # Errors
    ///
    /// Returns [`StagingError::Read`] when the stream fails and
    /// [`StagingError::Write`] or [`StagingError::Promote`] for filesystem
    /// failures. In every error case the staging file is gone and the final
    /// path is as it was before the call.
    pub fn install(&self, reader: &mut dyn Read) -> Result<u64, StagingError> {
        remove_if_present(&self.staging_path).map_err(|source| self.write_error(source))?;

        let mut guard = StagingGuard::new(&self.staging_path);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.staging_path)
            .map_err(|source| self.write_error(source))?;
        let written = self.copy_stream(reader, &mut file)?;
        file.sync_all().map_err(|source| self.write_error(source))?;
        drop(file);

        self.promote()?;
        guard.disarm();
        trace!("installed {written} bytes at {}", self.final_path);
        Ok(written)
    }

    /// Remove both the final and the staging file, if present.
    ///
    /// # Errors
    ///
    /// Returns the first removal error other than "not found".
    pub fn discard(&self) -> io::Result<()> {
        let staging = remove_if_present(&self.staging_path);
        remove_if_present(&self.final_path)?;
        staging
    }

    fn copy_stream(&self, reader: &mut dyn Read, file: &mut File) -> Result<u64, StagingError> {
        let mut buffer = vec![0_u8; COPY_BUFFER_LEN];
        let mut written: u64 = 0;
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => return Ok(written),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => return Err(StagingError::Read { source }),
            };
            file.write_all(&buffer[..read])
                .map_err(|source| self.write_error(source))?;
            written += read as u64;
        }
    }

    fn promote(&self) -> Result<(), StagingError> {
        let promote_error = |source| StagingError::Promote {
            from: self.staging_path.clone(),
            to: self.final_path.clone(),
            source,
        };
        remove_if_present(&self.final_path).map_err(promote_error)?;
        fs::rename(&self.staging_path, &self.final_path).map_err(promote_error)
    }

    fn write_error(&self, source: io::Error) -> StagingError {
        StagingError::Write {
            path: self.staging_path.clone(),
            source,
        }
    }
}

/// Stream `reader` into `final_path` via a staging file.
///
/// # Errors
///
/// See [`Stager::install`].
pub fn install_streaming(
    reader: &mut dyn Read,
    final_path: &Utf8Path,
) -> Result<u64, StagingError> {
    Stager::new(final_path).install(reader)
}

/// Remove `path`, treating a missing file as success.
///
/// # Errors
///
/// Returns any removal error other than [`io::ErrorKind::NotFound`].
pub fn remove_if_present(path: &Utf8Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Deletes the staging file on drop unless disarmed.
struct StagingGuard<'a> {
    path: &'a Utf8Path,
    armed: bool,
}

impl<'a> StagingGuard<'a> {
    fn new(path: &'a Utf8Path) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StagingGuard<'_> {
    fn drop(&mut self) {
        if self.armed && remove_if_present(self.path).is_err() {
            warn!("could not remove staging file {}", self.path);
        }
    }
}
