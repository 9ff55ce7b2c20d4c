//! Release artefact domain model.
//!
//! Everything needed to decide *what* to download and *how* to judge it,
//! without touching the filesystem layout of an installation:
//!
//! - [`target`] maps a host platform to its release asset.
//! - [`release`] builds binary and manifest URLs for a release.
//! - [`download`] fetches assets over HTTP with bounded redirects.
//! - [`idle_reader`] times out response bodies that stop arriving.
//! - [`manifest`] and [`manifest_parser`] read `SHA256SUMS` files.
//! - [`sha256_digest`] validates and computes digests.
//! - [`verification`] records the checksum policy.

pub mod download;
pub mod error;
pub mod idle_reader;
pub mod manifest;
pub mod manifest_parser;
pub mod release;
pub mod sha256_digest;
pub mod target;
pub mod verification;
