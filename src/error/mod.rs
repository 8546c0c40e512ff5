//! Error handling for scriptpack.
//!
//! This module provides:
//! - [`PackError`]: The main error enum for all packaging operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Rich error type with suggestion and context

mod codes;

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;

/// Main error type for packaging operations.
#[derive(Error, Debug)]
pub enum PackError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("Build step failed: {0}")]
    BuildFailed(String),

    #[error("Invalid descriptor {}: {reason}", .path.display())]
    DescriptorInvalid { path: PathBuf, reason: String },

    #[error("Duplicate script name '{name}' ({} and {})", .first.display(), .second.display())]
    DuplicateScript {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Bundler failed: {0}")]
    BundlerFailed(String),

    #[error("Archive for '{name}' failed: {reason}")]
    ArchiveFailed { name: String, reason: String },

    #[error("Archiving failed for {}", .failed.join(", "))]
    ArchivePhaseFailed { failed: Vec<String> },

    #[error("Background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl PackError {
    /// Get the error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::SerializationError,
            Self::Zip(_) | Self::ArchiveFailed { .. } => ErrorCode::ArchiveFailed,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::MissingConfig(_) => ErrorCode::ConfigMissingRequired,
            Self::BuildFailed(_) => ErrorCode::BuildFailed,
            Self::DescriptorInvalid { .. } => ErrorCode::DescriptorInvalid,
            Self::DuplicateScript { .. } => ErrorCode::DuplicateScript,
            Self::BundlerFailed(_) => ErrorCode::BundlerFailed,
            Self::ArchivePhaseFailed { .. } => ErrorCode::ArchivePhaseFailed,
            Self::TaskJoin(_) => ErrorCode::TaskFailed,
        }
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::DescriptorInvalid { path, reason } => {
                Some(serde_json::json!({ "path": path, "reason": reason }))
            }
            Self::DuplicateScript {
                name,
                first,
                second,
            } => Some(serde_json::json!({ "name": name, "first": first, "second": second })),
            Self::ArchiveFailed { name, reason } => {
                Some(serde_json::json!({ "script": name, "reason": reason }))
            }
            Self::ArchivePhaseFailed { failed } => Some(serde_json::json!({ "failed": failed })),
            Self::MissingConfig(key) => Some(serde_json::json!({ "config_key": key })),
            _ => None,
        }
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_pack_error(self)
    }
}

/// A structured error with machine-readable code, suggestion, and context.
///
/// Emitted on stdout in robot mode so callers can react to the failure kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    pub code: ErrorCode,
    pub numeric_code: u16,
    pub message: String,
    pub suggestion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    pub recoverable: bool,
    pub category: String,
}

impl StructuredError {
    #[must_use]
    pub fn from_pack_error(err: &PackError) -> Self {
        let code = err.code();
        Self {
            code,
            numeric_code: code.numeric(),
            message: err.to_string(),
            suggestion: code.suggestion().to_string(),
            context: err.context(),
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
        }
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&PackError> for StructuredError {
    fn from(err: &PackError) -> Self {
        Self::from_pack_error(err)
    }
}

/// Result type alias for packaging operations.
pub type Result<T> = std::result::Result<T, PackError>;
