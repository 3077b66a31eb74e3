//! DriveClient tests against a mocked Drive API
//!
//! Covers query construction, the two upload request shapes, and the
//! mapping of HTTP failures onto the store error taxonomy.

use wiremock::matchers::{body_string_contains, method, path, query_param, query_param_contains};
use wiremock::{Mock, ResponseTemplate};

use skysync_core::domain::newtypes::RemoteFolderId;
use skysync_core::ports::remote_store::StoreError;

use crate::common::setup_drive_mock;

fn root() -> RemoteFolderId {
    RemoteFolderId::root()
}

#[tokio::test]
async fn test_find_folder_found() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param_contains("q", "name = 'backups'"))
        .and(query_param_contains("q", "'root' in parents"))
        .and(query_param_contains("q", "trashed = false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{"id": "folder-abc", "name": "backups"}]
        })))
        .mount(&server)
        .await;

    let found = client.find_folder("backups", &root()).await.unwrap();
    assert_eq!(found.unwrap().as_str(), "folder-abc");
}

#[tokio::test]
async fn test_find_folder_not_found() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": []
        })))
        .mount(&server)
        .await;

    let found = client.find_folder("missing", &root()).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_create_folder() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/files"))
        .and(body_string_contains("vnd.google-apps.folder"))
        .and(body_string_contains("\"backups\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "folder-new"
        })))
        .mount(&server)
        .await;

    let id = client.create_folder("backups", &root()).await.unwrap();
    assert_eq!(id.as_str(), "folder-new");
}

#[tokio::test]
async fn test_find_file_returns_checksum() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param_contains("q", "name = 'report.pdf'"))
        .and(query_param_contains("q", "mimeType != '"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{
                "id": "file-1",
                "name": "report.pdf",
                "md5Checksum": "900150983cd24fb0d6963f7d28e17f72"
            }]
        })))
        .mount(&server)
        .await;

    let meta = client
        .find_file("report.pdf", &root())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(meta.id, "file-1");
    assert_eq!(
        meta.checksum.unwrap().as_str(),
        "900150983cd24fb0d6963f7d28e17f72"
    );
}

#[tokio::test]
async fn test_find_file_escapes_quotes_in_name() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param_contains("q", r"name = 'it\'s.txt'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": []
        })))
        .mount(&server)
        .await;

    let found = client.find_file("it's.txt", &root()).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_create_file_multipart() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/files"))
        .and(query_param("uploadType", "multipart"))
        .and(body_string_contains("\"notes.txt\""))
        .and(body_string_contains("file content here"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "file-created"
        })))
        .mount(&server)
        .await;

    let id = client
        .create_file("notes.txt", &root(), b"file content here".to_vec())
        .await
        .unwrap();
    assert_eq!(id, "file-created");
}

#[tokio::test]
async fn test_update_file_media() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("PATCH"))
        .and(path("/files/file-9"))
        .and(query_param("uploadType", "media"))
        .and(body_string_contains("updated bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "file-9"
        })))
        .mount(&server)
        .await;

    client
        .update_file("file-9", b"updated bytes".to_vec())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unauthorized_maps_to_authorization_required() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.find_file("a.txt", &root()).await.unwrap_err();
    assert!(matches!(err, StoreError::AuthorizationRequired(_)));
}

#[tokio::test]
async fn test_server_error_maps_to_transient() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client.find_file("a.txt", &root()).await.unwrap_err();
    assert!(matches!(err, StoreError::TransientConnectivity(_)));
}

#[tokio::test]
async fn test_rate_limit_maps_to_transient() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = client.find_file("a.txt", &root()).await.unwrap_err();
    assert!(matches!(err, StoreError::TransientConnectivity(_)));
}

#[tokio::test]
async fn test_client_error_maps_to_unexpected() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.find_file("a.txt", &root()).await.unwrap_err();
    assert!(matches!(err, StoreError::Unexpected(_)));
}
