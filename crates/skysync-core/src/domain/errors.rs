//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures and malformed identifiers.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote path format or content
    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),

    /// Invalid remote folder id
    #[error("Invalid remote folder id: {0}")]
    InvalidFolderId(String),

    /// Invalid content hash (expected lowercase hex MD5)
    #[error("Invalid hash format: {0}")]
    InvalidHash(String),

    /// Unknown cloud provider tag
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// A local path could not be made relative to its folder root
    #[error("Path not within folder root: {0}")]
    PathNotInRoot(String),
}
