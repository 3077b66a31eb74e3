//! Integration tests for skysync-drive
//!
//! Uses wiremock to simulate the Google Drive API v3 and verifies
//! end-to-end behavior of the DriveClient and the DriveStore upload
//! protocol (folder resolution, create/update/skip, error taxonomy).

mod common;

mod test_client;
mod test_provider;
