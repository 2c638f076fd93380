//! Token refresh, replay and auth endpoint tests against a mocked API.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use feedly_client::metadata::RequestDescriptor;
use feedly_client::transport::{PreparedRequest, RawResponse, Transport};
use feedly_client::{Credentials, Error, ErrorKind, FeedlyClient, Scope};
use http::StatusCode;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn stale_credentials() -> Credentials {
    Credentials::new("my-app", "secret")
        .with_access_token("OLD")
        .with_refresh_token("R1")
        .with_last_refresh_attempt(Some(Utc::now() - ChronoDuration::days(2)))
}

fn client_for(server: &MockServer, credentials: Credentials) -> FeedlyClient {
    FeedlyClient::builder()
        .base_url(server.uri())
        .credentials(credentials)
        .retries(0)
        .build()
        .unwrap()
}

async fn mount_token_refresh(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/v3/auth/token"))
        .and(body_json(json!({
            "grant_type": "refresh_token",
            "client_id": "my-app",
            "client_secret": "secret",
            "refresh_token": "R1"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "NEW", "expires_in": 3600})),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_unauthorized_refreshes_once_and_replays_with_new_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/profile"))
        .and(header("authorization", "Bearer OLD"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/profile"))
        .and(header("authorization", "Bearer NEW"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "af190c49"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_token_refresh(&server, 1).await;

    let client = client_for(&server, stale_credentials());
    let before = Utc::now();

    let response = client
        .request_json::<serde_json::Value>(RequestDescriptor::get("/v3/profile"))
        .await
        .unwrap();

    assert_eq!(response.data["id"], "af190c49");
    assert_eq!(response.attempts, 2);

    let credentials = client.credentials();
    assert_eq!(credentials.access_token(), Some("NEW"));
    assert!(credentials.last_refresh_attempt().unwrap() >= before);
    assert!(credentials.expires.unwrap() > before);

    let requests = server.received_requests().await.unwrap();
    let token_request = requests
        .iter()
        .find(|r| r.url.path() == "/v3/auth/token")
        .unwrap();
    assert!(token_request.headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_unauthorized_after_replay_is_raised() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/profile"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    mount_token_refresh(&server, 1).await;

    let client = client_for(&server, stale_credentials());
    let error = client
        .request(RequestDescriptor::get("/v3/profile"))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Unauthorized);
    assert_eq!(error.to_string(), "401: Unauthorized");
}

#[tokio::test]
async fn test_no_refresh_within_a_day_of_last_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/profile"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_token_refresh(&server, 0).await;

    let credentials = Credentials::new("my-app", "secret")
        .with_access_token("OLD")
        .with_refresh_token("R1");
    let client = client_for(&server, credentials);

    let error = client
        .request(RequestDescriptor::get("/v3/profile"))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_no_refresh_without_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/profile"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_token_refresh(&server, 0).await;

    let credentials = Credentials::new("my-app", "secret")
        .with_access_token("OLD")
        .with_last_refresh_attempt(None);
    let client = client_for(&server, credentials);

    let error = client
        .request(RequestDescriptor::get("/v3/profile"))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_failed_refresh_raises_original_error_and_throttles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/profile"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errorId": "auth-1",
            "errorMessage": "refresh token revoked"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, stale_credentials());
    let before = Utc::now();

    for _ in 0..2 {
        let error = client
            .request(RequestDescriptor::get("/v3/profile"))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unauthorized);
    }

    let credentials = client.credentials();
    assert_eq!(credentials.access_token(), Some("OLD"));
    assert!(credentials.last_refresh_attempt().unwrap() >= before);
}

#[tokio::test]
async fn test_auth_endpoints_never_trigger_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/logout"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_token_refresh(&server, 0).await;

    let client = client_for(&server, stale_credentials());
    let error = client.log_out().await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Unauthorized);
    assert_eq!(client.credentials().access_token(), Some("OLD"));
}

#[tokio::test]
async fn test_invalid_path_is_a_configuration_error() {
    let server = MockServer::start().await;
    let client = client_for(&server, stale_credentials());

    let error = client
        .request(RequestDescriptor::get("/v2/profile"))
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Configuration(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_enterprise_collections_use_enterprise_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/enterprise/collections"))
        .and(header("authorization", "Bearer OLD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "enterprise/acme/category/1234", "label": "Threat Intel"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, stale_credentials());
    let collections = client.collections(Scope::Enterprise).await.unwrap();

    assert_eq!(collections.len(), 1);
    assert_eq!(collections[0].label(), Some("Threat Intel"));
    assert_eq!(collections[0].scope(), Scope::Enterprise);
}

#[tokio::test]
async fn test_exchange_auth_code_stores_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/token"))
        .and(body_json(json!({
            "grant_type": "authorization_code",
            "client_id": "my-app",
            "client_secret": "secret",
            "code": "C0DE",
            "redirect_uri": "http://localhost:8080"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "af190c49",
            "access_token": "A1",
            "refresh_token": "R1",
            "expires_in": 604800,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Credentials::new("my-app", "secret"));
    client
        .exchange_auth_code("C0DE", "http://localhost:8080")
        .await
        .unwrap();

    let credentials = client.credentials();
    assert_eq!(credentials.access_token(), Some("A1"));
    assert_eq!(credentials.refresh_token.as_deref(), Some("R1"));
    assert!(credentials.expires.unwrap() > Utc::now() + ChronoDuration::days(6));
}

#[tokio::test]
async fn test_auth_code_request_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/auth/auth"))
        .and(query_param("response_type", "code"))
        .and(query_param("client_id", "my-app"))
        .and(query_param("redirect_uri", "http://localhost:8080"))
        .and(query_param("scope", "https://cloud.feedly.com/subscriptions"))
        .and(query_param("state", "xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Credentials::new("my-app", "secret"));
    let response = client
        .auth_code_request("http://localhost:8080", [("state", "xyz")])
        .await
        .unwrap();

    assert_eq!(response.raw_body, "<html>login</html>");
}

#[tokio::test]
async fn test_log_out_clears_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/logout"))
        .and(header("authorization", "Bearer OLD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, stale_credentials());
    client.log_out().await.unwrap();

    let credentials = client.credentials();
    assert!(credentials.access_token().is_none());
    assert!(credentials.refresh_token.is_none());
}

#[tokio::test]
async fn test_revoke_refresh_token_clears_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/token"))
        .and(body_json(json!({
            "grant_type": "revoke_token",
            "client_id": "my-app",
            "client_secret": "secret",
            "refresh_token": "R1"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, stale_credentials());
    client.revoke_refresh_token().await.unwrap();

    assert!(client.credentials().refresh_token.is_none());
}

#[tokio::test]
async fn test_huge_expires_in_leaves_expiry_unset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A1",
            "refresh_token": "R1",
            "expires_in": 1e300
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Credentials::new("my-app", "secret"));
    client.exchange_auth_code("C", "http://x").await.unwrap();

    let credentials = client.credentials();
    assert_eq!(credentials.access_token(), Some("A1"));
    assert!(credentials.expires.is_none());
}

#[tokio::test]
async fn test_refresh_with_huge_expires_in_still_replays() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/profile"))
        .and(header("authorization", "Bearer OLD"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/profile"))
        .and(header("authorization", "Bearer NEW"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "af190c49"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "NEW", "expires_in": 1e300})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, stale_credentials());
    let response = client.request(RequestDescriptor::get("/v3/profile")).await.unwrap();

    assert_eq!(response.attempts, 2);
    assert_eq!(client.credentials().access_token(), Some("NEW"));
    assert!(client.credentials().expires.is_none());
}

#[tokio::test]
async fn test_paths_sharing_the_auth_prefix_still_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/authors/jane"))
        .and(header("authorization", "Bearer OLD"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/authors/jane"))
        .and(header("authorization", "Bearer NEW"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_token_refresh(&server, 1).await;

    let client = client_for(&server, stale_credentials());
    let response = client
        .request(RequestDescriptor::get("/v3/authors/jane"))
        .await
        .unwrap();

    assert_eq!(response.attempts, 2);
}

/// Answers every API call with 401 and fails to connect to the token endpoint.
#[derive(Default)]
struct TokenEndpointDown {
    api_calls: AtomicUsize,
    token_calls: AtomicUsize,
}

#[async_trait]
impl Transport for TokenEndpointDown {
    async fn send(&self, request: PreparedRequest) -> feedly_client::Result<RawResponse> {
        if request.url.path() == "/v3/auth/token" {
            self.token_calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::network("connection refused"))
        } else {
            self.api_calls.fetch_add(1, Ordering::SeqCst);
            Ok(RawResponse::new(StatusCode::UNAUTHORIZED, request.url))
        }
    }
}

#[tokio::test]
async fn test_connection_failure_during_refresh_propagates() {
    let transport = Arc::new(TokenEndpointDown::default());
    let client = FeedlyClient::builder()
        .base_url("https://cloud.feedly.com")
        .credentials(stale_credentials())
        .retries(0)
        .transport(transport.clone())
        .build()
        .unwrap();

    let error = client
        .request(RequestDescriptor::get("/v3/profile"))
        .await
        .unwrap_err();

    assert!(error.is_connection());
    assert!(matches!(error, Error::Network(_)));
    assert_eq!(transport.api_calls.load(Ordering::SeqCst), 1);
    assert_eq!(transport.token_calls.load(Ordering::SeqCst), 1);
    assert_eq!(client.credentials().access_token(), Some("OLD"));
}
