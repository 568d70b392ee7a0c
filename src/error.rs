//! Error types for object storage operations

use std::path::PathBuf;

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, CosError>;

/// Classification of a failure reported by the storage service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    NotFound,
    AlreadyExists,
    PermissionDenied,
    Conflict,
    /// Request never got a service response (dispatch failure, timeout)
    Transport,
    Other,
}

impl StorageErrorKind {
    /// Map an S3 error code (and HTTP status, when known) to a kind
    pub fn from_code(code: Option<&str>, status: Option<u16>) -> Self {
        match code {
            Some("NoSuchBucket" | "NoSuchKey" | "NotFound" | "NoSuchUpload") => Self::NotFound,
            Some("BucketAlreadyExists" | "BucketAlreadyOwnedByYou") => Self::AlreadyExists,
            Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "Forbidden") => {
                Self::PermissionDenied
            }
            Some("BucketNotEmpty" | "OperationAborted" | "Conflict") => Self::Conflict,
            _ => match status {
                Some(404) => Self::NotFound,
                Some(403) => Self::PermissionDenied,
                Some(409) => Self::Conflict,
                _ => Self::Other,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageErrorKind::NotFound => "not found",
            StorageErrorKind::AlreadyExists => "already exists",
            StorageErrorKind::PermissionDenied => "permission denied",
            StorageErrorKind::Conflict => "conflict",
            StorageErrorKind::Transport => "transport",
            StorageErrorKind::Other => "other",
        }
    }
}

impl std::fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CosError {
    /// Missing or malformed credentials, endpoint or option
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Endpoint discovery failed or returned an unexpected document
    #[error("endpoint resolution failed: {0}")]
    Resolution(String),

    #[error("{op} failed ({kind}): {message}")]
    Storage {
        op: &'static str,
        kind: StorageErrorKind,
        message: String,
    },

    #[error("{op} transfer failed: {message}")]
    Transfer { op: &'static str, message: String },

    #[error("signing failed: {0}")]
    Signing(String),

    /// Reader used out of order (opened twice, or after close)
    #[error("reader is {0}")]
    ReaderState(&'static str),

    #[error("temporary file {path:?}: {source}")]
    TempFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The operation failed and the local cleanup that followed failed too.
    /// `source` is the operation's own error.
    #[error("{source} (cleanup also failed: {cleanup})")]
    CleanupFailed {
        #[source]
        source: Box<CosError>,
        cleanup: String,
    },
}

impl CosError {
    pub fn storage(op: &'static str, kind: StorageErrorKind, message: impl Into<String>) -> Self {
        CosError::Storage {
            op,
            kind,
            message: message.into(),
        }
    }

    pub fn transfer(op: &'static str, message: impl Into<String>) -> Self {
        CosError::Transfer {
            op,
            message: message.into(),
        }
    }

    /// Storage kind of this error, looking through cleanup wrappers
    pub fn storage_kind(&self) -> Option<StorageErrorKind> {
        match self {
            CosError::Storage { kind, .. } => Some(*kind),
            CosError::CleanupFailed { source, .. } => source.storage_kind(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.storage_kind() == Some(StorageErrorKind::NotFound)
    }

    /// Attach a cleanup failure to this error without replacing it
    pub fn with_cleanup_failure(self, cleanup: impl std::fmt::Display) -> Self {
        CosError::CleanupFailed {
            source: Box::new(self),
            cleanup: cleanup.to_string(),
        }
    }

    /// Re-label a failure that happened while moving object data
    pub(crate) fn into_transfer(self, op: &'static str) -> Self {
        match self {
            CosError::Transfer { .. } => self,
            other => CosError::transfer(op, other.to_string()),
        }
    }

    /// Translate an SDK error into a `Storage` error
    pub(crate) fn from_sdk<E>(op: &'static str, err: SdkError<E, HttpResponse>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    {
        let kind = match &err {
            SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => StorageErrorKind::Transport,
            SdkError::ServiceError(ctx) => StorageErrorKind::from_code(
                ctx.err().code(),
                Some(ctx.raw().status().as_u16()),
            ),
            SdkError::ResponseError(ctx) => {
                StorageErrorKind::from_code(None, Some(ctx.raw().status().as_u16()))
            }
            _ => StorageErrorKind::Other,
        };

        CosError::Storage {
            op,
            kind,
            message: DisplayErrorContext(&err).to_string(),
        }
    }
}
