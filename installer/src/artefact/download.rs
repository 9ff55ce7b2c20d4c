//! Transfer of release assets over HTTP.
//!
//! [`Fetcher`] abstracts a single logical GET so the install pipeline can be
//! exercised without network access. [`HttpFetcher`] is the `ureq`-backed
//! implementation. It disables the client's own redirect handling and
//! follows `Location` headers itself with a bounded hop budget, so the
//! redirect limit and relative-location resolution are under our control.
//!
//! The timeout bounds each phase of a request up to the response head. The
//! body is bounded by inactivity instead of total duration, so a large
//! binary that keeps arriving is never cut off.

use log::debug;
use std::io::{self, Read};
use std::time::Duration;
use ureq::http::Uri;

use super::idle_reader::IdleTimeoutReader;

/// Default per-phase and body-inactivity timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(20_000);

/// Default number of redirect hops followed before giving up.
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Readable response body of a successful fetch.
pub type FetchedBody = Box<dyn Read>;

/// Trait for fetching release assets.
///
/// Abstractions allow tests to script HTTP behaviour without network access.
#[cfg_attr(test, mockall::automock)]
pub trait Fetcher {
    /// Issue a GET for `url`, following redirects, and return the live body
    /// of the final `200 OK` response.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] on transport failure, timeout, a non-200
    /// final status, or when the redirect budget is exhausted.
    fn fetch(&self, url: &str) -> Result<FetchedBody, FetchError>;
}

/// Errors arising from a single fetch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The redirect budget ran out before a final response.
    #[error("too many redirects fetching {url} (limit {limit})")]
    TooManyRedirects {
        /// The URL originally requested.
        url: String,
        /// Number of hops that were followed.
        limit: u32,
    },

    /// The final response was not `200 OK`.
    #[error("HTTP {status} from {url}")]
    BadStatus {
        /// The response status code.
        status: u16,
        /// The URL that produced it.
        url: String,
    },

    /// No response activity occurred within the configured timeout.
    #[error("request to {url} timed out after {timeout_ms} ms")]
    Timeout {
        /// The URL that timed out.
        url: String,
        /// The timeout that elapsed, in milliseconds.
        timeout_ms: u128,
    },

    /// A redirect carried a `Location` that cannot be resolved.
    #[error("invalid redirect location \"{location}\" from {url}")]
    InvalidLocation {
        /// The URL that sent the redirect.
        url: String,
        /// The raw `Location` header value.
        location: String,
    },

    /// Connection, TLS, or protocol failure.
    #[error("request to {url} failed: {reason}")]
    Transport {
        /// The URL being requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The body of a successful response could not be read.
    #[error("failed to read response body from {url}: {source}")]
    Body {
        /// The URL whose body failed.
        url: String,
        /// The underlying read error.
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    /// Recover a fetch error carried inside a body read error.
    ///
    /// Bodies returned by [`HttpFetcher`] report an inactivity timeout as an
    /// [`io::Error`] wrapping [`FetchError::Timeout`].
    ///
    /// # Errors
    ///
    /// Returns the original error unchanged when it carries no fetch error.
    pub fn from_body_error(err: io::Error) -> Result<Self, io::Error> {
        if !err.get_ref().is_some_and(|inner| inner.is::<Self>()) {
            return Err(err);
        }
        let kind = err.kind();
        match err.into_inner().map(|inner| inner.downcast::<Self>()) {
            Some(Ok(fetch)) => Ok(*fetch),
            Some(Err(inner)) => Err(io::Error::new(kind, inner)),
            None => Err(io::Error::from(kind)),
        }
    }
}

/// Timeout and redirect limits for [`HttpFetcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Bound on connecting, sending the request, receiving the response
    /// head, and on any gap between body reads.
    pub timeout: Duration,
    /// Maximum redirect hops to follow.
    pub max_redirects: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// HTTP fetcher using `ureq` with manual redirect handling.
pub struct HttpFetcher {
    agent: ureq::Agent,
    options: FetchOptions,
}

impl HttpFetcher {
    /// Create a fetcher with the given limits.
    #[must_use]
    pub fn new(options: FetchOptions) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_resolve(Some(options.timeout))
            .timeout_connect(Some(options.timeout))
            .timeout_send_request(Some(options.timeout))
            .timeout_recv_response(Some(options.timeout))
            .max_redirects(0)
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            options,
        }
    }

    /// The limits this fetcher was built with.
    #[must_use]
    pub fn options(&self) -> FetchOptions {
        self.options
    }

    fn map_ureq_error(&self, url: &str, err: ureq::Error) -> FetchError {
        match err {
            ureq::Error::Timeout(_) => self.timeout_error(url),
            ureq::Error::Io(io_err) if io_err.kind() == io::ErrorKind::TimedOut => {
                self.timeout_error(url)
            }
            ureq::Error::StatusCode(status) => FetchError::BadStatus {
                status,
                url: url.to_owned(),
            },
            ureq::Error::TooManyRedirects => FetchError::TooManyRedirects {
                url: url.to_owned(),
                limit: self.options.max_redirects,
            },
            other => FetchError::Transport {
                url: url.to_owned(),
                reason: other.to_string(),
            },
        }
    }

    fn timeout_error(&self, url: &str) -> FetchError {
        FetchError::Timeout {
            url: url.to_owned(),
            timeout_ms: self.options.timeout.as_millis(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(FetchOptions::default())
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedBody, FetchError> {
        let mut current = url.to_owned();
        let mut hops_left = self.options.max_redirects;
        loop {
            debug!("GET {current}");
            let response = self
                .agent
                .get(&current)
                .call()
                .map_err(|e| self.map_ureq_error(&current, e))?;
            let status = response.status().as_u16();

            let location = response
                .headers()
                .get("location")
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            if let (true, Some(location)) = ((300..400).contains(&status), location) {
                if hops_left == 0 {
                    return Err(FetchError::TooManyRedirects {
                        url: url.to_owned(),
                        limit: self.options.max_redirects,
                    });
                }
                hops_left -= 1;
                let next = resolve_location(&current, &location)?;
                debug!("HTTP {status} redirect {current} -> {next}");
                current = next;
                continue;
            }

            if status != 200 {
                return Err(FetchError::BadStatus {
                    status,
                    url: current,
                });
            }
            let body = IdleTimeoutReader::spawn(
                response.into_body().into_reader(),
                self.options.timeout,
                current.as_str(),
            )
            .map_err(|e| FetchError::Transport {
                url: current.clone(),
                reason: e.to_string(),
            })?;
            return Ok(Box::new(body));
        }
    }
}

/// Fetch `url` and read the whole body as UTF-8 text.
///
/// # Errors
///
/// Returns the fetch error, [`FetchError::Timeout`] if the body stalls, or
/// [`FetchError::Body`] if the body cannot be read or is not valid UTF-8.
pub fn fetch_text(fetcher: &dyn Fetcher, url: &str) -> Result<String, FetchError> {
    let mut body = fetcher.fetch(url)?;
    let mut text = String::new();
    body.read_to_string(&mut text).map_err(|err| {
        FetchError::from_body_error(err).unwrap_or_else(|source| FetchError::Body {
            url: url.to_owned(),
            source,
        })
    })?;
    Ok(text)
}

/// Resolve a `Location` header against the URL that returned it.
///
/// Handles absolute URLs, scheme-relative (`//host/path`), absolute-path
/// (`/path`), and path-relative (`file`) forms.
///
/// # Errors
///
/// Returns [`FetchError::InvalidLocation`] when `current` is not an absolute
/// URL or the location is empty.
///
/// # Examples
///
/// ```
/// use codexline_installer::artefact::download::resolve_location;
///
/// let next = resolve_location("https://example.test/a/b/file", "../c").expect("resolves");
/// assert_eq!(next, "https://example.test/a/b/../c");
/// ```
pub fn resolve_location(current: &str, location: &str) -> Result<String, FetchError> {
    let invalid = || FetchError::InvalidLocation {
        url: current.to_owned(),
        location: location.to_owned(),
    };
    let location = location.trim();
    if location.is_empty() {
        return Err(invalid());
    }
    if has_scheme(location) {
        return Ok(location.to_owned());
    }

    let base: Uri = current.parse().map_err(|_| invalid())?;
    let scheme = base.scheme_str().ok_or_else(invalid)?;
    let authority = base.authority().ok_or_else(invalid)?;

    if let Some(rest) = location.strip_prefix("//") {
        return Ok(format!("{scheme}://{rest}"));
    }
    if location.starts_with('/') {
        return Ok(format!("{scheme}://{authority}{location}"));
    }
    let path = base.path();
    let directory = path.rfind('/').map_or("/", |idx| &path[..=idx]);
    Ok(format!("{scheme}://{authority}{directory}{location}"))
}

fn has_scheme(location: &str) -> bool {
    location.split_once("://").is_some_and(|(scheme, _)| {
        scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

#[cfg(test)]
#[path = "download_tests.rs"]
mod tests;
