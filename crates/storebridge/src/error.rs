//! Error types for the storebridge library.

use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the bridge.
#[derive(Error, Debug)]
pub enum Error {
    /// Runtime failed to start
    #[error("Init error: {0}")]
    Init(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend client construction failed
    #[error("Failed to connect backend client: {0}")]
    Connect(String),

    /// The submission queue is permanently closed (pool shut down)
    #[error("Submission channel closed")]
    ChannelClosed,

    /// The worker vanished without writing a response.
    ///
    /// This indicates a broken liveness invariant and is surfaced as an
    /// error rather than a hang.
    #[error("Completion signal dropped before a response was written")]
    CompletionLost,

    /// A backend operation failed after retries were exhausted or a
    /// non-retryable failure occurred.
    #[error("{op} failed after {attempts} attempt(s): {message}")]
    Operation {
        op: OpKind,
        kind: ErrorKind,
        message: String,
        attempts: u32,
    },

    /// The stream cursor was already closed
    #[error("Stream is closed")]
    ClosedStream,

    /// The object ended before the requested byte count was available
    #[error("Short read: requested {requested} bytes, object ended after {available}")]
    ShortRead { requested: usize, available: usize },

    /// Compression or decompression failure
    #[error("Compression error: {0}")]
    Compression(String),
}

impl Error {
    /// Machine-classifiable tag of the underlying failure, when present.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Operation { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// The logical operation that produced an [`Error::Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Get,
    Put,
    Delete,
    List,
    Head,
    MultipartStart,
    MultipartPart,
    MultipartComplete,
    MultipartAbort,
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OpKind::Get => "GET",
            OpKind::Put => "PUT",
            OpKind::Delete => "DELETE",
            OpKind::List => "LIST",
            OpKind::Head => "HEAD",
            OpKind::MultipartStart => "MULTIPART CREATE",
            OpKind::MultipartPart => "MULTIPART PART",
            OpKind::MultipartComplete => "MULTIPART COMPLETE",
            OpKind::MultipartAbort => "MULTIPART ABORT",
        };
        f.write_str(name)
    }
}

/// Classification tag for failed operations.
///
/// The human-readable message preserves the last underlying failure
/// verbatim; this tag exists for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Per-attempt request timeout
    Timeout,
    /// The body ended before the advertised length
    EarlyEof,
    /// Connection reset or closed mid-request
    ConnectionReset,
    /// Terminal HTTP status code
    StatusCode(u16),
    /// The caller-supplied destination buffer cannot hold the object
    BufferTooSmall,
    /// The object does not exist
    NotFound,
    /// Anything else
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Timeout => f.write_str("timeout"),
            ErrorKind::EarlyEof => f.write_str("early-eof"),
            ErrorKind::ConnectionReset => f.write_str("connection"),
            ErrorKind::StatusCode(code) => write!(f, "status-code {}", code),
            ErrorKind::BufferTooSmall => f.write_str("buffer-too-small"),
            ErrorKind::NotFound => f.write_str("not-found"),
            ErrorKind::Other => f.write_str("other"),
        }
    }
}
