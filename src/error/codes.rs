//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Build step errors
//! - 2xx: Descriptor errors
//! - 3xx: Config errors
//! - 4xx: Bundler errors
//! - 5xx: Archive errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for robot mode output.
///
/// Each variant maps to a numeric code (e.g., `BuildFailed` -> E101).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Build errors (1xx)
    // ========================================
    /// E101: The external build step exited unsuccessfully
    BuildFailed,

    // ========================================
    // Descriptor errors (2xx)
    // ========================================
    /// E201: A descriptor file is missing required data or is malformed
    DescriptorInvalid,
    /// E202: Two descriptors resolve to the same script name
    DuplicateScript,

    // ========================================
    // Config errors (3xx)
    // ========================================
    /// E301: Config file has invalid syntax or values
    ConfigInvalid,
    /// E302: Required config value is missing
    ConfigMissingRequired,

    // ========================================
    // Bundler errors (4xx)
    // ========================================
    /// E401: The bundler could not be invoked at all
    BundlerFailed,

    // ========================================
    // Archive errors (5xx)
    // ========================================
    /// E501: Writing a single archive failed
    ArchiveFailed,
    /// E502: One or more archives failed during the archiving phase
    ArchivePhaseFailed,

    // ========================================
    // Internal errors (9xx)
    // ========================================
    /// E901: Filesystem read or write failed
    IoError,
    /// E902: Serialization/deserialization failed
    SerializationError,
    /// E903: A background task panicked or was cancelled
    TaskFailed,
}

impl ErrorCode {
    /// Numeric form of the code (e.g. 101).
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::BuildFailed => 101,
            Self::DescriptorInvalid => 201,
            Self::DuplicateScript => 202,
            Self::ConfigInvalid => 301,
            Self::ConfigMissingRequired => 302,
            Self::BundlerFailed => 401,
            Self::ArchiveFailed => 501,
            Self::ArchivePhaseFailed => 502,
            Self::IoError => 901,
            Self::SerializationError => 902,
            Self::TaskFailed => 903,
        }
    }

    /// Category label derived from the numeric range.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "build",
            2 => "descriptor",
            3 => "config",
            4 => "bundler",
            5 => "archive",
            _ => "internal",
        }
    }

    /// Whether re-running (possibly after a fix) can be expected to succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::TaskFailed)
    }

    /// Short recovery hint shown alongside the error.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::BuildFailed => "Fix the build errors above and run the packager again",
            Self::DescriptorInvalid => "Re-run the build step to regenerate .info.json files",
            Self::DuplicateScript => "Rename one of the entry scripts so names are unique",
            Self::ConfigInvalid => "Check scriptpack.toml for syntax errors",
            Self::ConfigMissingRequired => "Add the missing value to scriptpack.toml",
            Self::BundlerFailed => "Check that the bundler program is installed and on PATH",
            Self::ArchiveFailed | Self::ArchivePhaseFailed => {
                "Re-run with --only-changed to retry only the failed archives"
            }
            Self::IoError => "Check file permissions and free disk space",
            Self::SerializationError => "The file may be corrupted; regenerate it",
            Self::TaskFailed => "This is a bug; please report it with -vv output",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E{}", self.numeric())
    }
}
