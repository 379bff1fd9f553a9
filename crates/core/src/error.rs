//! Error taxonomy for the generative-media call orchestrator.
//!
//! Every failure surfaced by this crate is one of a closed set of
//! kinds. Callers branch on [`ErrorKind`], never on message contents.

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, Error>;

/// The closed set of failure kinds surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or invalid project/region/client configuration
    Configuration,
    /// A caller-supplied parameter violates a request invariant
    Input,
    /// The remote service failed in a way that may succeed on resubmit
    TransientRemote,
    /// Retries exhausted on `ResourceExhausted`
    QuotaExhausted,
    /// The credential cannot access the resource
    PermissionDenied,
    /// The remote call exceeded its deadline
    Timeout,
    /// Bucket, object, or model endpoint does not exist
    NotFound,
    /// Retries exhausted on `Unavailable`
    Unavailable,
    /// A wire-level value could not be parsed or encoded
    InvalidArgument,
    /// Local file or byte-payload processing failed
    FileProcessing,
    /// Anything that does not fit the taxonomy
    Unknown,
}

impl ErrorKind {
    /// Stable label used when re-raising to the node host.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "Configuration",
            ErrorKind::Input => "Input",
            ErrorKind::TransientRemote => "TransientRemote",
            ErrorKind::QuotaExhausted => "QuotaExhausted",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Unavailable => "Unavailable",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::FileProcessing => "FileProcessing",
            ErrorKind::Unknown => "Unknown",
        }
    }
}

/// Orchestrator error, one variant per [`ErrorKind`].
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid project/region/client configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A caller-supplied parameter violates a request invariant
    #[error("Invalid input: {0}")]
    Input(String),

    /// The remote service failed in a way that may succeed on resubmit
    #[error("Transient remote failure: {0}")]
    TransientRemote(String),

    /// Retries exhausted on quota codes
    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    /// The credential cannot access the resource
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The remote call exceeded its deadline
    #[error("Deadline exceeded: {0}")]
    Timeout(String),

    /// Bucket, object, or model endpoint does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Retries exhausted on availability codes
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// A wire-level value could not be parsed or encoded
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Local file or byte-payload processing failed
    #[error("File processing error: {0}")]
    FileProcessing(String),

    /// Anything that does not fit the taxonomy
    #[error("{0}")]
    Unknown(String),
}

impl Error {
    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::Input(_) => ErrorKind::Input,
            Error::TransientRemote(_) => ErrorKind::TransientRemote,
            Error::QuotaExhausted(_) => ErrorKind::QuotaExhausted,
            Error::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Unavailable(_) => ErrorKind::Unavailable,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::FileProcessing(_) => ErrorKind::FileProcessing,
            Error::Unknown(_) => ErrorKind::Unknown,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::FileProcessing(err.to_string())
    }
}

impl From<RemoteError> for Error {
    fn from(remote: RemoteError) -> Self {
        let message = remote.message;
        match remote.status {
            RemoteStatus::ResourceExhausted => Error::QuotaExhausted(message),
            RemoteStatus::Unavailable => Error::Unavailable(message),
            RemoteStatus::InvalidArgument => Error::InvalidArgument(message),
            RemoteStatus::PermissionDenied | RemoteStatus::Unauthenticated => {
                Error::PermissionDenied(message)
            }
            RemoteStatus::DeadlineExceeded => Error::Timeout(message),
            RemoteStatus::NotFound => Error::NotFound(message),
            RemoteStatus::Internal | RemoteStatus::Unknown => Error::Unknown(message),
        }
    }
}

/// Status codes reported by the remote generative/storage surface.
///
/// Normalizes the gRPC-style codes and their HTTP equivalents into one
/// set: HTTP 429 is `ResourceExhausted`, HTTP 503 is `Unavailable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    /// Rate limit or quota hit (gRPC RESOURCE_EXHAUSTED, HTTP 429)
    ResourceExhausted,
    /// Service temporarily unavailable (gRPC UNAVAILABLE, HTTP 503)
    Unavailable,
    /// Malformed request (gRPC INVALID_ARGUMENT, HTTP 400)
    InvalidArgument,
    /// Credential rejected (gRPC PERMISSION_DENIED, HTTP 403)
    PermissionDenied,
    /// Credential missing (gRPC UNAUTHENTICATED, HTTP 401)
    Unauthenticated,
    /// Call deadline exceeded (gRPC DEADLINE_EXCEEDED, HTTP 504)
    DeadlineExceeded,
    /// Resource does not exist (gRPC NOT_FOUND, HTTP 404)
    NotFound,
    /// Server-side failure (gRPC INTERNAL, HTTP 500)
    Internal,
    /// Unclassified remote failure
    Unknown,
}

impl RemoteStatus {
    /// Map an HTTP status code onto the normalized set.
    pub fn from_http(status: u16) -> Self {
        match status {
            400 => RemoteStatus::InvalidArgument,
            401 => RemoteStatus::Unauthenticated,
            403 => RemoteStatus::PermissionDenied,
            404 => RemoteStatus::NotFound,
            429 => RemoteStatus::ResourceExhausted,
            500 => RemoteStatus::Internal,
            503 => RemoteStatus::Unavailable,
            504 => RemoteStatus::DeadlineExceeded,
            _ => RemoteStatus::Unknown,
        }
    }

    /// Retry is attempted only for quota and availability codes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteStatus::ResourceExhausted | RemoteStatus::Unavailable
        )
    }
}

/// A failure reported by a remote service, before taxonomy mapping.
///
/// Produced by the service implementations; consumed by the retry
/// wrapper, which decides whether to retry and how to map terminal
/// codes onto [`Error`].
#[derive(Debug, Clone, Error)]
#[error("{status:?}: {message}")]
pub struct RemoteError {
    /// Normalized status code
    pub status: RemoteStatus,
    /// Diagnostic message from the remote service
    pub message: String,
}

impl RemoteError {
    /// Create a remote error with the given status and message.
    pub fn new(status: RemoteStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}
