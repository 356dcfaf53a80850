//! End-to-end verification over real HTTP against a mock tokeninfo
//! endpoint. The blocking fetcher runs on the test thread; the mock
//! server lives on a multi-thread tokio runtime kept alive alongside.

use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tollgate::{Authenticator, HttpFetcher, HttpFetcherConfig, ModuleConfig, Outcome};

const BODY: &str = r#"{"sub":"alice","scope":"read","extra":{"a":1,"b":[1,2,3]},"aud":"svc1"}"#;

fn start_endpoint(rt: &Runtime, status: u16, body: &str) -> MockServer {
    rt.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tokeninfo"))
            .respond_with(ResponseTemplate::new(status).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;
        server
    })
}

fn authenticator(endpoint: &str, checks: &[&str]) -> Authenticator<HttpFetcher> {
    let mut args = vec![endpoint, "sub"];
    args.extend_from_slice(checks);
    let config = ModuleConfig::from_args(&args).unwrap();

    // The mock endpoint is plain HTTP.
    let fetcher = HttpFetcher::new(HttpFetcherConfig {
        allow_plaintext: true,
        ..Default::default()
    })
    .unwrap();

    Authenticator::with_fetcher(config, fetcher)
}

#[test]
fn authenticates_against_mock_endpoint() {
    let rt = Runtime::new().unwrap();
    let server = start_endpoint(&rt, 200, BODY);
    let endpoint = format!("{}/tokeninfo?access_token=", server.uri());

    let auth = authenticator(&endpoint, &["aud=svc1"]);
    assert_eq!(auth.authenticate("alice", "secret-token"), Outcome::Success);
}

#[test]
fn unknown_subject_over_http() {
    let rt = Runtime::new().unwrap();
    let server = start_endpoint(&rt, 200, BODY);
    let endpoint = format!("{}/tokeninfo?access_token=", server.uri());

    let auth = authenticator(&endpoint, &["aud=svc1"]);
    assert_eq!(auth.authenticate("bob", "secret-token"), Outcome::UserUnknown);
}

#[test]
fn rejected_status_is_auth_mismatch() {
    let rt = Runtime::new().unwrap();
    let server = start_endpoint(&rt, 401, r#"{"error":"invalid_token"}"#);
    let endpoint = format!("{}/tokeninfo?access_token=", server.uri());

    let auth = authenticator(&endpoint, &[]);
    assert_eq!(
        auth.authenticate("alice", "expired-token"),
        Outcome::AuthMismatch
    );
}

#[test]
fn connection_refused_is_service_unavailable() {
    // Nothing listens on the discard port.
    let auth = authenticator("http://127.0.0.1:9/tokeninfo?access_token=", &[]);
    assert_eq!(
        auth.authenticate("alice", "secret-token"),
        Outcome::ServiceUnavailable
    );
}

#[test]
fn nested_response_fields_walk_correctly_over_http() {
    let rt = Runtime::new().unwrap();
    let body = serde_json::json!({
        "active": true,
        "sub": "alice",
        "scope": "read write",
        "nested": { "a": [1, 2, {"b": null}], "c": {"d": false} },
        "aud": "svc1",
        "exp": 1754300000u64,
    })
    .to_string();
    let server = start_endpoint(&rt, 200, &body);
    let endpoint = format!("{}/tokeninfo?access_token=", server.uri());

    let auth = authenticator(&endpoint, &["aud=svc1"]);
    assert_eq!(auth.authenticate("alice", "secret-token"), Outcome::Success);

    // "active" is a boolean in the response: asserting it is a decisive
    // non-string mismatch.
    let strict = authenticator(&endpoint, &["active=true"]);
    assert_eq!(
        strict.authenticate("alice", "secret-token"),
        Outcome::AuthMismatch
    );
}
