//! DriveStore end-to-end tests against a mocked Drive API
//!
//! Exercises the full upload protocol: session establishment from a
//! persisted token, remote folder resolution with caching, and the
//! create/update/skip decision per file.

use wiremock::matchers::{body_string_contains, method, path, query_param, query_param_contains};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skysync_core::domain::newtypes::RemotePath;
use skysync_core::domain::LocalFileEntry;
use skysync_core::ports::remote_store::{IRemoteStore, StoreError};

use crate::common::{
    mount_file_lookup, mount_folder_lookup, setup_drive_store,
};

fn remote(path: &str) -> RemotePath {
    RemotePath::new(path).unwrap()
}

/// Creates a local file under `dir` and returns its entry relative to `dir`
fn local_file(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> LocalFileEntry {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    LocalFileEntry::new(path, dir.path()).unwrap()
}

#[tokio::test]
async fn test_upload_creates_missing_folder_and_file() {
    let server = MockServer::start().await;
    let (_creds, store) = setup_drive_store(&server).await;
    let local = tempfile::TempDir::new().unwrap();
    let entry = local_file(&local, "a.txt", b"hello");

    // Folder lookup misses, so the folder gets created.
    mount_folder_lookup(&server, "backups", serde_json::json!([])).await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .and(body_string_contains("vnd.google-apps.folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "folder-b"
        })))
        .expect(1)
        .mount(&server)
        .await;

    // No remote file of that name, so the upload is a create.
    mount_file_lookup(&server, "a.txt", serde_json::json!([])).await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .and(query_param("uploadType", "multipart"))
        .and(body_string_contains("hello"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "file-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let report = store
        .upload_files(&remote("/backups"), &[entry], Some(local.path()))
        .await
        .unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.updated, 0);
    assert_eq!(report.skipped, 0);
}

#[tokio::test]
async fn test_upload_skips_unchanged_file() {
    let server = MockServer::start().await;
    let (_creds, store) = setup_drive_store(&server).await;
    let local = tempfile::TempDir::new().unwrap();
    // MD5("abc") = 900150983cd24fb0d6963f7d28e17f72
    let entry = local_file(&local, "a.txt", b"abc");

    mount_folder_lookup(
        &server,
        "backups",
        serde_json::json!([{"id": "folder-b", "name": "backups"}]),
    )
    .await;
    mount_file_lookup(
        &server,
        "a.txt",
        serde_json::json!([{
            "id": "file-1",
            "name": "a.txt",
            "md5Checksum": "900150983cd24fb0d6963f7d28e17f72"
        }]),
    )
    .await;

    // No write request of either shape may go out.
    Mock::given(method("POST"))
        .and(query_param("uploadType", "multipart"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let report = store
        .upload_files(&remote("/backups"), &[entry], Some(local.path()))
        .await
        .unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.created + report.updated, 0);
}

#[tokio::test]
async fn test_upload_updates_changed_file_in_place() {
    let server = MockServer::start().await;
    let (_creds, store) = setup_drive_store(&server).await;
    let local = tempfile::TempDir::new().unwrap();
    let entry = local_file(&local, "a.txt", b"new content");

    mount_folder_lookup(
        &server,
        "backups",
        serde_json::json!([{"id": "folder-b", "name": "backups"}]),
    )
    .await;
    mount_file_lookup(
        &server,
        "a.txt",
        serde_json::json!([{
            "id": "file-7",
            "name": "a.txt",
            "md5Checksum": "00000000000000000000000000000000"
        }]),
    )
    .await;

    // The existing id must be overwritten, not a new file created.
    Mock::given(method("PATCH"))
        .and(path("/files/file-7"))
        .and(query_param("uploadType", "media"))
        .and(body_string_contains("new content"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "file-7"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let report = store
        .upload_files(&remote("/backups"), &[entry], Some(local.path()))
        .await
        .unwrap();

    assert_eq!(report.updated, 1);
    assert_eq!(report.created + report.skipped, 0);
}

#[tokio::test]
async fn test_folder_resolved_once_per_cycle() {
    let server = MockServer::start().await;
    let (_creds, store) = setup_drive_store(&server).await;
    let local = tempfile::TempDir::new().unwrap();
    let entries = vec![
        local_file(&local, "a.txt", b"aaa"),
        local_file(&local, "b.txt", b"bbb"),
    ];

    // Two files target the same folder; the lookup must happen once.
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param_contains("q", "name = 'backups'"))
        .and(query_param_contains("q", "mimeType = '"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{"id": "folder-b", "name": "backups"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    mount_file_lookup(&server, "a.txt", serde_json::json!([])).await;
    mount_file_lookup(&server, "b.txt", serde_json::json!([])).await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .and(query_param("uploadType", "multipart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "file-x"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let report = store
        .upload_files(&remote("/backups"), &entries, Some(local.path()))
        .await
        .unwrap();

    assert_eq!(report.created, 2);
}

#[tokio::test]
async fn test_nested_subtree_structure_preserved() {
    let server = MockServer::start().await;
    let (_creds, store) = setup_drive_store(&server).await;
    let local = tempfile::TempDir::new().unwrap();
    let entry = local_file(&local, "sub/deep.txt", b"deep");

    // Both /backups and /backups/sub resolve.
    mount_folder_lookup(
        &server,
        "backups",
        serde_json::json!([{"id": "folder-b", "name": "backups"}]),
    )
    .await;
    mount_folder_lookup(
        &server,
        "sub",
        serde_json::json!([{"id": "folder-sub", "name": "sub"}]),
    )
    .await;
    mount_file_lookup(&server, "deep.txt", serde_json::json!([])).await;

    // The file must land in the subfolder's parent list.
    Mock::given(method("POST"))
        .and(path("/files"))
        .and(query_param("uploadType", "multipart"))
        .and(body_string_contains("folder-sub"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "file-d"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let report = store
        .upload_files(&remote("/backups"), &[entry], Some(local.path()))
        .await
        .unwrap();

    assert_eq!(report.created, 1);
}

#[tokio::test]
async fn test_flat_upload_ignores_subdirectories() {
    let server = MockServer::start().await;
    let (_creds, store) = setup_drive_store(&server).await;
    let local = tempfile::TempDir::new().unwrap();
    let entry = local_file(&local, "sub/deep.txt", b"deep");

    mount_folder_lookup(
        &server,
        "backups",
        serde_json::json!([{"id": "folder-b", "name": "backups"}]),
    )
    .await;
    mount_file_lookup(&server, "deep.txt", serde_json::json!([])).await;

    // Without a local base the file lands directly in the root folder.
    Mock::given(method("POST"))
        .and(path("/files"))
        .and(query_param("uploadType", "multipart"))
        .and(body_string_contains("folder-b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "file-d"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let report = store
        .upload_files(&remote("/backups"), &[entry], None)
        .await
        .unwrap();

    assert_eq!(report.created, 1);
}

#[tokio::test]
async fn test_unauthorized_discards_session() {
    let server = MockServer::start().await;
    let (_creds, store) = setup_drive_store(&server).await;
    let local = tempfile::TempDir::new().unwrap();
    let entry = local_file(&local, "a.txt", b"abc");

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = store
        .upload_files(&remote("/backups"), &[entry.clone()], Some(local.path()))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AuthorizationRequired(_)));

    // The next call opens a fresh session from the persisted token rather
    // than reusing the rejected one.
    let err = store
        .upload_files(&remote("/backups"), &[entry], Some(local.path()))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AuthorizationRequired(_)));
}

#[tokio::test]
async fn test_ensure_session_with_valid_token() {
    let server = MockServer::start().await;
    let (_creds, store) = setup_drive_store(&server).await;

    store.ensure_session(false).await.unwrap();
    // Idempotent: a second call reuses the live session.
    store.ensure_session(false).await.unwrap();
}

#[tokio::test]
async fn test_ensure_session_without_token_file() {
    let server = MockServer::start().await;
    let creds = tempfile::TempDir::new().unwrap();
    let store = skysync_drive::provider::DriveStore::new(
        creds.path().join("token.json"),
        creds.path().join("client_secret.json"),
    )
    .with_base_urls(server.uri(), server.uri());

    let err = store.ensure_session(false).await.unwrap_err();
    assert!(matches!(err, StoreError::MissingCredentialFile(_)));
}
