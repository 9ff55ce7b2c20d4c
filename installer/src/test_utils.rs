//! Shared test utilities for the installer crate.
//!
//! Available to unit tests and, through the `test-support` feature, to
//! integration tests.

use crate::artefact::download::{FetchError, FetchedBody, Fetcher};
use crate::retry::Sleeper;
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::{self, Cursor, Read};
use std::time::Duration;

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Builds `SHA256SUMS` text line by line.
#[derive(Debug, Default)]
pub struct ManifestBuilder {
    lines: Vec<String>,
}

impl ManifestBuilder {
    /// Start an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text-mode record (`<digest>  <name>`).
    #[must_use]
    pub fn entry(mut self, digest: &str, name: &str) -> Self {
        self.lines.push(format!("{digest}  {name}"));
        self
    }

    /// Add a binary-mode record (`<digest> *<name>`).
    #[must_use]
    pub fn binary_entry(mut self, digest: &str, name: &str) -> Self {
        self.lines.push(format!("{digest} *{name}"));
        self
    }

    /// Add a raw line, e.g. a comment or blank line.
    #[must_use]
    pub fn line(mut self, text: &str) -> Self {
        self.lines.push(text.to_owned());
        self
    }

    /// Render the manifest text with a trailing newline.
    pub fn build(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

/// Scripted reply for one [`StubFetcher`] request.
#[derive(Debug)]
pub enum StubResponse {
    /// A `200 OK` whose body is these bytes.
    Body(Vec<u8>),
    /// A `200 OK` whose body yields these bytes and then breaks.
    Truncated(Vec<u8>),
    /// A `200 OK` whose body yields these bytes and then goes silent until
    /// the fetch timeout fires.
    Stalled(Vec<u8>),
    /// The request fails.
    Error(FetchError),
}

/// A [`Fetcher`] that replays scripted responses per URL.
///
/// Each URL has a queue; every request pops the next reply. A URL with no
/// reply left answers `404`. All requested URLs are recorded in order.
#[derive(Debug, Default)]
pub struct StubFetcher {
    responses: RefCell<HashMap<String, VecDeque<StubResponse>>>,
    requests: RefCell<Vec<String>>,
}

impl StubFetcher {
    /// Create a fetcher with no scripted replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `response` for the next request to `url`.
    #[must_use]
    pub fn respond(self, url: &str, response: StubResponse) -> Self {
        self.responses
            .borrow_mut()
            .entry(url.to_owned())
            .or_default()
            .push_back(response);
        self
    }

    /// Queue `times` transport failures for `url`.
    #[must_use]
    pub fn fail(mut self, url: &str, times: usize) -> Self {
        for _ in 0..times {
            self = self.respond(
                url,
                StubResponse::Error(FetchError::Transport {
                    url: url.to_owned(),
                    reason: "connection refused".to_owned(),
                }),
            );
        }
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl Fetcher for StubFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedBody, FetchError> {
        self.requests.borrow_mut().push(url.to_owned());
        let next = self
            .responses
            .borrow_mut()
            .get_mut(url)
            .and_then(VecDeque::pop_front);
        match next {
            Some(StubResponse::Body(bytes)) => Ok(Box::new(Cursor::new(bytes))),
            Some(StubResponse::Truncated(bytes)) => Ok(Box::new(TruncatedBody {
                inner: Cursor::new(bytes),
            })),
            Some(StubResponse::Stalled(bytes)) => Ok(Box::new(StalledBody {
                inner: Cursor::new(bytes),
                url: url.to_owned(),
            })),
            Some(StubResponse::Error(err)) => Err(err),
            None => Err(FetchError::BadStatus {
                status: 404,
                url: url.to_owned(),
            }),
        }
    }
}

/// Body that ends in a connection reset instead of EOF.
struct TruncatedBody {
    inner: Cursor<Vec<u8>>,
}

impl Read for TruncatedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf)? {
            0 => Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset mid-body",
            )),
            n => Ok(n),
        }
    }
}

/// Body that reports an inactivity timeout once its bytes run out.
struct StalledBody {
    inner: Cursor<Vec<u8>>,
    url: String,
}

impl Read for StalledBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf)? {
            0 => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                FetchError::Timeout {
                    url: self.url.clone(),
                    timeout_ms: STALL_TIMEOUT_MS,
                },
            )),
            n => Ok(n),
        }
    }
}

/// Timeout reported by [`StubResponse::Stalled`] bodies.
pub const STALL_TIMEOUT_MS: u128 = 20_000;

/// A [`Sleeper`] that records requested delays instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Create a sleeper with no recorded delays.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order.
    pub fn durations(&self) -> Vec<Duration> {
        self.slept.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
    }
}
