//! Backend client trait definition.

use async_trait::async_trait;
use bytes::Bytes;
use std::ops::Range;
use thiserror::Error;

/// Result type for transport-level client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Transport-level failure, shaped so the retry controller can classify it
/// without inspecting message text.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The per-attempt request timeout elapsed
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection reset, closed, or refused
    #[error("connection error: {0}")]
    Connection(String),

    /// The response body ended before the advertised length
    #[error("early eof: {0}")]
    EarlyEof(String),

    /// The backend answered with an HTTP error status
    #[error("status {code}: {message}")]
    Status { code: u16, message: String },

    /// Anything the transport could not classify further
    #[error("{0}")]
    Other(String),
}

impl From<object_store::Error> for ClientError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => ClientError::NotFound(path),
            // The store's Generic class covers transport-level failures
            // (resets, timeouts surfaced by the HTTP client, 5xx bodies).
            // Treated as retryable, matching the dispatch loop's historical
            // retry-on-generic policy.
            err @ object_store::Error::Generic { .. } => ClientError::Connection(err.to_string()),
            err => ClientError::Other(err.to_string()),
        }
    }
}

/// Metadata returned by a head request.
#[derive(Debug, Clone)]
pub struct ObjectMetadata {
    /// Size in bytes
    pub size: u64,
    /// ETag or content hash (if available)
    pub e_tag: Option<String>,
}

/// One entry of a listing chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Full object location
    pub location: String,
    /// Size in bytes
    pub size: u64,
}

/// One chunk of a paginated listing.
#[derive(Debug, Clone)]
pub struct ListPage {
    /// Entries, ordered lexicographically by location
    pub entries: Vec<ObjectEntry>,
    /// Continuation key; `None` means the listing is exhausted
    pub continuation: Option<String>,
}

/// Trait for pooled backend clients.
///
/// Multipart uploads are index-addressed: retrying a part with the same
/// index replaces it instead of appending, which is what makes per-part
/// retry safe.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Read an object, or a byte range of it.
    async fn get(&self, path: &str, range: Option<Range<usize>>) -> ClientResult<Bytes>;

    /// Fetch object metadata.
    async fn head(&self, path: &str) -> ClientResult<ObjectMetadata>;

    /// Write an object in a single shot.
    async fn put(&self, path: &str, data: Bytes) -> ClientResult<()>;

    /// Delete an object.
    async fn delete(&self, path: &str) -> ClientResult<()>;

    /// List one page of keys under a prefix, starting strictly after
    /// `start_after` when given, at most `max_entries` entries.
    ///
    /// Implementations must stream keys in lexicographic order: the
    /// continuation key is the page's last entry, so a key delivered
    /// after a lexically larger one would be skipped on resume.
    async fn list_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        max_entries: usize,
    ) -> ClientResult<ListPage>;

    /// Begin a multipart upload, returning its id.
    async fn multipart_start(&self, path: &str) -> ClientResult<String>;

    /// Upload one part, returning the backend's part reference.
    async fn multipart_put_part(
        &self,
        path: &str,
        upload_id: &str,
        index: usize,
        data: Bytes,
    ) -> ClientResult<String>;

    /// Commit all parts as a single atomic object. `parts` must be ordered
    /// by part index, not completion order.
    async fn multipart_complete(
        &self,
        path: &str,
        upload_id: &str,
        parts: Vec<String>,
    ) -> ClientResult<()>;

    /// Abandon a multipart upload and release backend-side resources.
    async fn multipart_abort(&self, path: &str, upload_id: &str) -> ClientResult<()>;
}
