//! Shared test helpers for Drive API integration tests
//!
//! Provides wiremock-based mock server setup for Drive v3 endpoints. The
//! same mock server stands in for both the metadata and the upload base
//! URL; the two traffic kinds are told apart by their `uploadType` query
//! parameter.

use chrono::{Duration, Utc};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param_contains};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skysync_drive::client::DriveClient;
use skysync_drive::provider::DriveStore;

/// Starts a mock server and returns a client pointed at it
pub async fn setup_drive_mock() -> (MockServer, DriveClient) {
    let server = MockServer::start().await;
    let client = DriveClient::with_base_urls("test-access-token", server.uri(), server.uri());
    (server, client)
}

/// Writes a valid token file and returns a store pointed at the mock server
///
/// The returned TempDir owns the credential files and must stay alive for
/// the duration of the test.
pub async fn setup_drive_store(server: &MockServer) -> (TempDir, DriveStore) {
    let dir = TempDir::new().expect("create temp dir");
    write_valid_token(&dir);

    let store = DriveStore::new(
        dir.path().join("token.json"),
        dir.path().join("client_secret.json"),
    )
    .with_base_urls(server.uri(), server.uri());

    (dir, store)
}

/// Writes a token file whose access token is valid for another hour
pub fn write_valid_token(dir: &TempDir) {
    let tokens = serde_json::json!({
        "access_token": "test-access-token",
        "refresh_token": "test-refresh-token",
        "expires_at": (Utc::now() + Duration::hours(1)).to_rfc3339(),
    });
    std::fs::write(
        dir.path().join("token.json"),
        serde_json::to_string_pretty(&tokens).expect("serialize tokens"),
    )
    .expect("write token file");
}

/// Mounts a folder lookup (`mimeType = folder`) returning the given files
///
/// `name` narrows the mock to queries for that folder name.
pub async fn mount_folder_lookup(server: &MockServer, name: &str, files: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param_contains("q", format!("name = '{}'", name)))
        .and(query_param_contains("q", "mimeType = '"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": files
        })))
        .mount(server)
        .await;
}

/// Mounts a file lookup (`mimeType != folder`) returning the given files
pub async fn mount_file_lookup(server: &MockServer, name: &str, files: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param_contains("q", format!("name = '{}'", name)))
        .and(query_param_contains("q", "mimeType != '"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": files
        })))
        .mount(server)
        .await;
}

