//! Google Drive API v3 client
//!
//! Provides a typed HTTP client for the Drive REST API. Handles bearer
//! authentication, JSON deserialization, query escaping, and the two Drive
//! base URLs (metadata vs. media upload).
//!
//! Errors are classified at this layer: connection and timeout failures
//! and 429/5xx responses become [`StoreError::TransientConnectivity`],
//! 401 becomes [`StoreError::AuthorizationRequired`], anything else is
//! [`StoreError::Unexpected`].

use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use skysync_core::domain::newtypes::{FileHash, ProviderKind, RemoteFolderId};
use skysync_core::domain::RemoteFileMetadata;
use skysync_core::ports::remote_store::StoreError;

/// Base URL for Drive API v3 metadata operations
const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Base URL for Drive API v3 media uploads
const UPLOAD_BASE_URL: &str = "https://www.googleapis.com/upload/drive/v3";

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// MIME type Drive assigns to folders
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// MIME type used for uploaded file content
const OCTET_STREAM: &str = "application/octet-stream";

/// Fields requested from list queries
const LIST_FIELDS: &str = "files(id,name,md5Checksum)";

// ============================================================================
// Drive API response types
// ============================================================================

/// Response from `GET /files?q=...`
#[derive(Debug, Deserialize)]
struct FileListResponse {
    /// Matching files, unordered
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// A single file resource from the Drive API
#[derive(Debug, Deserialize)]
struct DriveFile {
    /// Drive file ID
    id: String,
    /// File name within its parent folder
    name: String,
    /// MD5 of the content; absent for folders and native Google documents
    #[serde(rename = "md5Checksum")]
    md5_checksum: Option<String>,
}

impl DriveFile {
    /// Converts the API resource into domain metadata
    ///
    /// A checksum the API returns in an unexpected shape is treated as
    /// absent rather than failing the listing; the caller then re-uploads.
    fn into_metadata(self) -> RemoteFileMetadata {
        let checksum = self
            .md5_checksum
            .and_then(|hex| FileHash::new(hex).ok());
        RemoteFileMetadata {
            id: self.id,
            name: self.name,
            checksum,
        }
    }
}

/// Response from file create/update calls
#[derive(Debug, Deserialize)]
struct FileResource {
    /// Drive file ID
    id: String,
}

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for Google Drive API calls
///
/// Wraps `reqwest::Client` with bearer authentication and base URL
/// construction. Both base URLs can be overridden for testing against a
/// mock server.
pub struct DriveClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for metadata requests
    base_url: String,
    /// Base URL for media upload requests
    upload_base_url: String,
    /// Current OAuth2 access token
    access_token: String,
}

impl DriveClient {
    /// Creates a new DriveClient with the given access token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DRIVE_BASE_URL.to_string(),
            upload_base_url: UPLOAD_BASE_URL.to_string(),
            access_token: access_token.into(),
        }
    }

    /// Creates a new DriveClient with custom base URLs (useful for testing)
    pub fn with_base_urls(
        access_token: impl Into<String>,
        base_url: impl Into<String>,
        upload_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            upload_base_url: upload_base_url.into(),
            access_token: access_token.into(),
        }
    }

    /// Updates the access token (e.g., after a token refresh)
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
        debug!("Updated DriveClient access token");
    }

    /// Returns a reference to the current access token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Creates an authenticated request builder against the metadata base URL
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
            .timeout(REQUEST_TIMEOUT)
    }

    /// Creates an authenticated request builder against the upload base URL
    fn upload_request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.upload_base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
            .timeout(REQUEST_TIMEOUT)
    }

    /// Looks up a subfolder by name inside a parent folder
    ///
    /// # Returns
    /// The folder's ID if a non-trashed folder with that exact name exists
    pub async fn find_folder(
        &self,
        name: &str,
        parent: &RemoteFolderId,
    ) -> Result<Option<RemoteFolderId>, StoreError> {
        let q = format!(
            "name = '{}' and '{}' in parents and mimeType = '{}' and trashed = false",
            escape_query_literal(name),
            parent.as_str(),
            FOLDER_MIME_TYPE
        );
        debug!(name, parent = parent.as_str(), "Looking up folder");

        let list: FileListResponse = self
            .send_json(
                self.request(Method::GET, "/files")
                    .query(&[("q", q.as_str()), ("fields", LIST_FIELDS)]),
            )
            .await?;

        Ok(list
            .files
            .into_iter()
            .next()
            .and_then(|f| RemoteFolderId::new(f.id).ok()))
    }

    /// Creates a subfolder inside a parent folder
    ///
    /// # Returns
    /// The new folder's ID
    pub async fn create_folder(
        &self,
        name: &str,
        parent: &RemoteFolderId,
    ) -> Result<RemoteFolderId, StoreError> {
        debug!(name, parent = parent.as_str(), "Creating folder");

        let body = json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [parent.as_str()],
        });

        let created: FileResource = self
            .send_json(self.request(Method::POST, "/files").json(&body))
            .await?;

        RemoteFolderId::new(created.id)
            .context("Drive returned an empty folder id")
            .map_err(StoreError::Unexpected)
    }

    /// Looks up a file by name inside a parent folder
    ///
    /// # Returns
    /// Metadata for a non-trashed, non-folder entry with that exact name
    pub async fn find_file(
        &self,
        name: &str,
        parent: &RemoteFolderId,
    ) -> Result<Option<RemoteFileMetadata>, StoreError> {
        let q = format!(
            "name = '{}' and '{}' in parents and mimeType != '{}' and trashed = false",
            escape_query_literal(name),
            parent.as_str(),
            FOLDER_MIME_TYPE
        );
        debug!(name, parent = parent.as_str(), "Looking up file");

        let list: FileListResponse = self
            .send_json(
                self.request(Method::GET, "/files")
                    .query(&[("q", q.as_str()), ("fields", LIST_FIELDS)]),
            )
            .await?;

        Ok(list.files.into_iter().next().map(DriveFile::into_metadata))
    }

    /// Creates a new file with content in a single multipart request
    ///
    /// Uses `uploadType=multipart`: a `multipart/related` body carrying the
    /// JSON metadata part followed by the raw content part.
    ///
    /// # Returns
    /// The new file's Drive ID
    pub async fn create_file(
        &self,
        name: &str,
        parent: &RemoteFolderId,
        content: Vec<u8>,
    ) -> Result<String, StoreError> {
        debug!(name, parent = parent.as_str(), bytes = content.len(), "Creating file");

        let metadata = json!({
            "name": name,
            "parents": [parent.as_str()],
        });

        let boundary = format!("skysync-{}", uuid::Uuid::new_v4());
        let body = build_multipart_related(&boundary, &metadata.to_string(), &content);

        let created: FileResource = self
            .send_json(
                self.upload_request(Method::POST, "/files?uploadType=multipart")
                    .header(
                        "Content-Type",
                        format!("multipart/related; boundary={}", boundary),
                    )
                    .body(body),
            )
            .await?;

        Ok(created.id)
    }

    /// Replaces an existing file's content in place
    ///
    /// Uses `uploadType=media` with PATCH; the name and parent are left
    /// untouched.
    pub async fn update_file(&self, file_id: &str, content: Vec<u8>) -> Result<(), StoreError> {
        debug!(file_id, bytes = content.len(), "Updating file content");

        let path = format!("/files/{}?uploadType=media", file_id);
        let _updated: FileResource = self
            .send_json(
                self.upload_request(Method::PATCH, &path)
                    .header("Content-Type", OCTET_STREAM)
                    .body(content),
            )
            .await?;

        Ok(())
    }

    /// Sends a request and parses a JSON body, classifying failures
    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, StoreError> {
        let response = request.send().await.map_err(classify_transport_error)?;
        let response = check_status(response)?;
        response
            .json()
            .await
            .context("Failed to parse Drive API response")
            .map_err(StoreError::Unexpected)
    }
}

/// Escapes a string literal for embedding in a Drive `q=` query
///
/// Drive query literals are single-quoted; backslashes and single quotes
/// inside them must be backslash-escaped.
fn escape_query_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Assembles a `multipart/related` upload body by hand
///
/// reqwest's multipart support produces `multipart/form-data`, which the
/// Drive upload endpoint rejects, so the body is built manually.
fn build_multipart_related(boundary: &str, metadata_json: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata_json.len() + content.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata_json.as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", OCTET_STREAM).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

/// Classifies a transport-level reqwest error
fn classify_transport_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() || e.is_connect() {
        StoreError::TransientConnectivity(e.to_string())
    } else {
        StoreError::Unexpected(anyhow::Error::new(e).context("Drive API request failed"))
    }
}

/// Maps an HTTP error status to the error taxonomy
///
/// 401 means the token is unusable, 429 and 5xx are retryable, everything
/// else is unexpected.
fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::UNAUTHORIZED {
        return Err(StoreError::AuthorizationRequired(ProviderKind::GoogleDrive));
    }

    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return Err(StoreError::TransientConnectivity(format!(
            "Drive API returned {}",
            status
        )));
    }

    Err(StoreError::Unexpected(anyhow::anyhow!(
        "Drive API returned unexpected status {}",
        status
    )))
}
