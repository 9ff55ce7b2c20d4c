//! codexline installer library.
//!
//! This crate downloads the prebuilt codexline binary for the host platform,
//! verifies it against the release's `SHA256SUMS` manifest, and installs it
//! atomically. It is used by the `codexline-install` binary and can be driven
//! programmatically with scripted collaborators for testing.
//!
//! # Modules
//!
//! - [`artefact`] - Release naming, HTTP fetching, and checksum manifests
//! - [`checksum`] - Verification of the installed binary against its manifest
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Environment and flag resolution into one install config
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Install errors and the stage each one belongs to
//! - [`install`] - The install pipeline
//! - [`install_path`] - Default output directory and binary path
//! - [`output`] - User-facing status lines
//! - [`permissions`] - Executable mode for the installed binary
//! - [`retry`] - Bounded retries with linear backoff
//! - [`stager`] - Atomic staging of a downloaded stream

pub mod artefact;
pub mod checksum;
pub mod cli;
pub mod config;
pub mod dirs;
pub mod error;
pub mod install;
pub mod install_path;
pub mod output;
pub mod permissions;
pub mod retry;
pub mod stager;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
