//! Tests for the HTTP fetcher and redirect resolution.

use super::*;
use rstest::rstest;
use std::io::Write;
use std::net::TcpListener;
use std::thread;
use std::time::Instant;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn read_all(mut body: FetchedBody) -> Vec<u8> {
    let mut bytes = Vec::new();
    body.read_to_end(&mut bytes).expect("read body");
    bytes
}

/// Serve one `200 OK` whose body arrives a byte at a time.
///
/// With `stall_after` set, the server goes quiet after that many bytes while
/// holding the connection open.
fn serve_trickle(len: usize, pause: Duration, stall_after: Option<usize>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut request = Vec::new();
        let mut buf = [0_u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).expect("read request");
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let head =
            format!("HTTP/1.1 200 OK\r\nContent-Length: {len}\r\nConnection: close\r\n\r\n");
        stream.write_all(head.as_bytes()).expect("write head");
        for sent in 0..len {
            if stall_after == Some(sent) {
                thread::sleep(Duration::from_secs(3));
                return;
            }
            thread::sleep(pause);
            if stream.write_all(b"x").and_then(|()| stream.flush()).is_err() {
                return;
            }
        }
    });
    format!("http://{addr}/codexline-linux-x64")
}

fn fetcher_with_timeout(ms: u64) -> HttpFetcher {
    HttpFetcher::new(FetchOptions {
        timeout: Duration::from_millis(ms),
        ..FetchOptions::default()
    })
}

fn redirect_to(location: &str) -> ResponseTemplate {
    ResponseTemplate::new(302).insert_header("Location", location)
}

#[tokio::test]
async fn fetch_returns_body_of_ok_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0.0/codexline-linux-x64"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x7fELF".to_vec()))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::default();
    let url = format!("{}/v1.0.0/codexline-linux-x64", server.uri());
    let body = fetcher.fetch(&url).expect("fetch succeeds");

    assert_eq!(read_all(body), b"\x7fELF");
}

#[tokio::test]
async fn fetch_reports_non_ok_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/missing", server.uri());
    let err = HttpFetcher::default()
        .fetch(&url)
        .err()
        .expect("404 should fail");

    assert!(
        matches!(err, FetchError::BadStatus { status: 404, .. }),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn fetch_follows_relative_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/releases/latest"))
        .respond_with(redirect_to("/assets/codexline-darwin-arm64"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/assets/codexline-darwin-arm64"))
        .respond_with(ResponseTemplate::new(200).set_body_string("binary"))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/releases/latest", server.uri());
    let body = HttpFetcher::default().fetch(&url).expect("redirect followed");

    assert_eq!(read_all(body), b"binary");
}

#[tokio::test]
async fn fetch_follows_absolute_redirects() {
    let server = MockServer::start().await;
    let target = format!("{}/cdn/asset", server.uri());
    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", target.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cdn/asset"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let body = HttpFetcher::default()
        .fetch(&format!("{}/start", server.uri()))
        .expect("redirect followed");

    assert_eq!(read_all(body), b"ok");
}

#[tokio::test]
async fn fetch_stops_after_redirect_limit() {
    let server = MockServer::start().await;
    for hop in 0..6 {
        Mock::given(method("GET"))
            .and(path(format!("/hop{hop}")))
            .respond_with(redirect_to(&format!("/hop{}", hop + 1)))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/hop6"))
        .respond_with(ResponseTemplate::new(200).set_body_string("never"))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(FetchOptions {
        max_redirects: 5,
        ..FetchOptions::default()
    });
    let err = fetcher
        .fetch(&format!("{}/hop0", server.uri()))
        .err()
        .expect("redirect chain should be rejected");

    assert!(matches!(err, FetchError::TooManyRedirects { limit: 5, .. }));
    assert!(err.to_string().contains("too many redirects"));
}

#[tokio::test]
async fn redirect_without_location_is_a_bad_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(302))
        .mount(&server)
        .await;

    let err = HttpFetcher::default()
        .fetch(&format!("{}/nowhere", server.uri()))
        .err()
        .expect("bare 302 should fail");

    assert!(matches!(err, FetchError::BadStatus { status: 302, .. }));
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_millis(1_500)),
        )
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(FetchOptions {
        timeout: Duration::from_millis(100),
        ..FetchOptions::default()
    });
    let err = fetcher
        .fetch(&format!("{}/slow", server.uri()))
        .err()
        .expect("request should time out");

    assert!(
        matches!(err, FetchError::Timeout { timeout_ms: 100, .. }),
        "unexpected error: {err}"
    );
}

#[test]
fn steady_body_outlasts_the_timeout() {
    let url = serve_trickle(10, Duration::from_millis(100), None);
    let started = Instant::now();

    let body = fetcher_with_timeout(400).fetch(&url).expect("head arrives");

    assert_eq!(read_all(body), b"xxxxxxxxxx");
    assert!(started.elapsed() > Duration::from_millis(400));
}

#[test]
fn stalled_body_times_out() {
    let url = serve_trickle(10, Duration::from_millis(20), Some(4));
    let mut body = fetcher_with_timeout(300).fetch(&url).expect("head arrives");

    let mut bytes = Vec::new();
    let read_err = body.read_to_end(&mut bytes).expect_err("body stalls");
    let err = FetchError::from_body_error(read_err).expect("carries a fetch error");

    assert_eq!(bytes, b"xxxx");
    assert!(
        matches!(
            err,
            FetchError::Timeout { timeout_ms: 300, ref url } if url.ends_with("/codexline-linux-x64")
        ),
        "unexpected error: {err}"
    );
}

#[test]
fn fetch_text_reports_stalled_body_as_timeout() {
    let url = serve_trickle(10, Duration::from_millis(20), Some(2));

    let err = fetch_text(&fetcher_with_timeout(300), &url).expect_err("body stalls");

    assert!(
        matches!(err, FetchError::Timeout { timeout_ms: 300, .. }),
        "unexpected error: {err}"
    );
}

#[test]
fn plain_body_errors_are_not_fetch_errors() {
    let err = io::Error::new(io::ErrorKind::ConnectionReset, "reset");

    let back = FetchError::from_body_error(err).expect_err("no fetch error inside");

    assert_eq!(back.kind(), io::ErrorKind::ConnectionReset);
}

#[tokio::test]
async fn fetch_text_reads_whole_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/SHA256SUMS"))
        .respond_with(ResponseTemplate::new(200).set_body_string("abc  file\n"))
        .mount(&server)
        .await;

    let text = fetch_text(
        &HttpFetcher::default(),
        &format!("{}/SHA256SUMS", server.uri()),
    )
    .expect("manifest text");

    assert_eq!(text, "abc  file\n");
}

#[test]
fn fetch_text_propagates_fetch_errors() {
    let mut fetcher = MockFetcher::new();
    fetcher.expect_fetch().returning(|url| {
        Err(FetchError::Transport {
            url: url.to_owned(),
            reason: "connection refused".to_owned(),
        })
    });

    let err = fetch_text(&fetcher, "https://example.test/SHA256SUMS")
        .expect_err("transport failure propagates");

    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn default_options_match_documented_limits() {
    let options = HttpFetcher::default().options();
    assert_eq!(options, FetchOptions::default());
    assert_eq!(options.timeout, Duration::from_millis(20_000));
    assert_eq!(options.max_redirects, 5);
}

#[rstest]
#[case::absolute("https://a.test/x/y", "https://b.test/z", "https://b.test/z")]
#[case::scheme_relative("https://a.test/x/y", "//cdn.test/z", "https://cdn.test/z")]
#[case::absolute_path("http://127.0.0.1:8080/x/y", "/z", "http://127.0.0.1:8080/z")]
#[case::path_relative("https://a.test/x/y", "z", "https://a.test/x/z")]
#[case::root_relative("https://a.test", "z", "https://a.test/z")]
#[case::trimmed("https://a.test/x", "  /z ", "https://a.test/z")]
fn resolves_locations(#[case] current: &str, #[case] location: &str, #[case] expected: &str) {
    assert_eq!(
        resolve_location(current, location).expect("resolves"),
        expected
    );
}

#[rstest]
#[case::empty("https://a.test/x", "")]
#[case::relative_base("not a url", "/z")]
fn rejects_unresolvable_locations(#[case] current: &str, #[case] location: &str) {
    assert!(matches!(
        resolve_location(current, location),
        Err(FetchError::InvalidLocation { .. })
    ));
}
