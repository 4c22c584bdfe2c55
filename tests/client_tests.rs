//! Integration tests for the authenticated request client, using wiremock
//! so no real network or credentials are involved.

mod common;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Method;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use graphmail_rs::{Error, RequestOptions, RetryConfig};

use common::{make_client, mount_token_endpoint, TOKEN_PATH};

#[tokio::test]
async fn returns_parsed_json_body_on_success() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path("/v1.0/me/messages/abc"))
        .and(header("authorization", "Bearer tok-1"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "abc",
            "subject": "hello"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = make_client(&server, RetryConfig::no_retry());
    let body = client
        .request(Method::GET, "me/messages/abc", RequestOptions::default())
        .await
        .expect("request succeeds")
        .expect("body present");

    assert_eq!(body["id"], "abc");
    assert_eq!(body["subject"], "hello");
}

#[tokio::test]
async fn empty_body_yields_none_and_text_body_yields_string() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "tok-1", 1).await;

    Mock::given(method("DELETE"))
        .and(path("/v1.0/me/messages/abc"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1.0/me/messages/abc/$value"))
        .respond_with(ResponseTemplate::new(200).set_body_string("raw mime content"))
        .expect(1)
        .mount(&server)
        .await;

    let client = make_client(&server, RetryConfig::no_retry());

    let deleted = client
        .request(Method::DELETE, "me/messages/abc", RequestOptions::default())
        .await
        .expect("delete succeeds");
    assert!(deleted.is_none());

    let raw = client
        .request(
            Method::GET,
            "me/messages/abc/$value",
            RequestOptions::default(),
        )
        .await
        .expect("raw fetch succeeds");
    assert_eq!(raw, Some(Value::String("raw mime content".to_string())));
}

#[tokio::test]
async fn caller_headers_never_override_authorization_or_accept() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path("/v1.0/me/messages"))
        .and(header("authorization", "Bearer tok-1"))
        .and(header("accept", "application/json"))
        .and(header("prefer", "outlook.body-content-type=\"text\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(1)
        .mount(&server)
        .await;

    let mut headers = HeaderMap::new();
    headers.insert("authorization", HeaderValue::from_static("Bearer forged"));
    headers.insert(ACCEPT, HeaderValue::from_static("text/html"));
    headers.insert(
        "prefer",
        HeaderValue::from_static("outlook.body-content-type=\"text\""),
    );

    let client = make_client(&server, RetryConfig::no_retry());
    client
        .request(
            Method::GET,
            "me/messages",
            RequestOptions {
                headers,
                ..Default::default()
            },
        )
        .await
        .expect("request succeeds");
}

#[tokio::test]
async fn unauthorized_once_forces_refresh_and_retries_exactly_once() {
    let server = MockServer::start().await;

    // First exchange hands out the stale token, the forced refresh hands
    // out the fresh one.
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-stale",
            "token_type": "Bearer",
            "expires_in": 3600,
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-fresh",
            "token_type": "Bearer",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1.0/me/messages/abc"))
        .and(header("authorization", "Bearer tok-stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1.0/me/messages/abc"))
        .and(header("authorization", "Bearer tok-fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = make_client(&server, RetryConfig::no_retry());
    let body = client
        .request(Method::GET, "me/messages/abc", RequestOptions::default())
        .await
        .expect("request succeeds after refresh")
        .expect("body present");

    assert_eq!(body["id"], "abc");
}

#[tokio::test]
async fn second_unauthorized_surfaces_api_error_without_third_attempt() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "tok-1", 2).await;

    Mock::given(method("GET"))
        .and(path("/v1.0/me/messages/abc"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": "InvalidAuthenticationToken", "message": "Access token has expired."}
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = make_client(&server, RetryConfig::no_retry());
    let err = client
        .request(Method::GET, "me/messages/abc", RequestOptions::default())
        .await
        .expect_err("second 401 must fail");

    match err {
        Error::Api { status, code, .. } => {
            assert_eq!(status, 401);
            assert_eq!(code.as_deref(), Some("InvalidAuthenticationToken"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // Mock expectations verify the request was sent exactly twice.
}

#[tokio::test]
async fn rate_limited_request_is_retried_to_the_configured_ceiling() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path("/v1.0/me/messages"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": "TooManyRequests", "message": "Throttled."}
        })))
        .expect(3)
        .mount(&server)
        .await;

    let client = make_client(&server, RetryConfig::default().with_max_attempts(3));
    let err = client
        .request(Method::GET, "me/messages", RequestOptions::default())
        .await
        .expect_err("throttling must surface after retries");

    assert_eq!(err.status(), Some(429));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn transient_server_errors_are_retried_until_success() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path("/v1.0/me/mailFolders"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1.0/me/mailFolders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = make_client(&server, RetryConfig::default());
    let body = client
        .request(Method::GET, "me/mailFolders", RequestOptions::default())
        .await
        .expect("request succeeds after transient failures")
        .expect("body present");

    assert_eq!(body["value"], json!([]));
}

#[tokio::test]
async fn error_envelope_is_decoded_into_typed_api_error() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path("/v1.0/me/messages/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "code": "ErrorItemNotFound",
                "message": "The specified object was not found in the store.",
                "innerError": {"request-id": "r-1"}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = make_client(&server, RetryConfig::no_retry());
    let err = client
        .request(Method::GET, "me/messages/missing", RequestOptions::default())
        .await
        .expect_err("404 must fail");

    match err {
        Error::Api {
            status,
            code,
            message,
            details,
        } => {
            assert_eq!(status, 404);
            assert_eq!(code.as_deref(), Some("ErrorItemNotFound"));
            assert!(message.contains("not found"));
            assert!(details.contains_key("innerError"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn second_request_reuses_cached_token_silently() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path("/v1.0/me/mailFolders"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(2)
        .mount(&server)
        .await;

    let client = make_client(&server, RetryConfig::no_retry());
    for _ in 0..2 {
        client
            .request(Method::GET, "me/mailFolders", RequestOptions::default())
            .await
            .expect("request succeeds");
    }
    // The token endpoint expectation (exactly one exchange) is what this
    // test is really about.
}

#[tokio::test]
async fn query_params_are_forwarded() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path("/v1.0/me/messages"))
        .and(query_param("$select", "id,subject"))
        .and(query_param("$top", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = make_client(&server, RetryConfig::no_retry());
    client
        .request(
            Method::GET,
            "me/messages",
            RequestOptions::with_params(vec![
                ("$select".to_string(), "id,subject".to_string()),
                ("$top".to_string(), "10".to_string()),
            ]),
        )
        .await
        .expect("request succeeds");
}
