//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Once;
use std::time::Duration;

use serde_json::json;
use tracing_subscriber::EnvFilter;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use graphmail_rs::{AuthConfig, ClientConfig, GraphClient, RetryConfig, TokenProvider};

/// Authority tenant used by every test configuration.
pub const TEST_TENANT: &str = "test-tenant";

/// Token endpoint path under the mock authority.
pub const TOKEN_PATH: &str = "/test-tenant/oauth2/v2.0/token";

/// Device-code endpoint path under the mock authority.
pub const DEVICE_CODE_PATH: &str = "/test-tenant/oauth2/v2.0/devicecode";

static INIT: Once = Once::new();

/// Initialize logging for tests.
pub fn init_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// An app-only configuration pointed at the mock server's authority, with
/// the on-disk cache disabled.
pub fn auth_config(server: &MockServer) -> AuthConfig {
    AuthConfig::new(TEST_TENANT, "test-client")
        .with_client_secret("test-secret")
        .with_authority(format!("{}/{}", server.uri(), TEST_TENANT))
        .with_cache_path(None)
        .with_timeout(Duration::from_secs(5))
}

/// Build a client whose base URL and authority both point at the mock
/// server.
pub fn make_client(server: &MockServer, retry: RetryConfig) -> GraphClient {
    init_logging();
    let auth = TokenProvider::new(auth_config(server)).expect("provider builds");
    let config = ClientConfig::default()
        .with_base_url(Url::parse(&format!("{}/v1.0/", server.uri())).expect("base URL parses"))
        .with_retry(retry.with_backoff_factor(Duration::from_millis(1)));
    GraphClient::new(auth, config).expect("client builds")
}

/// Mount a token endpoint that hands out `token` for every exchange.
pub async fn mount_token_endpoint(server: &MockServer, token: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "token_type": "Bearer",
            "expires_in": 3600,
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}
