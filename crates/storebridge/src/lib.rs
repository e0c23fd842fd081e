//! Storebridge Core Library
//!
//! This crate provides an asynchronous request bridge to object storage
//! backends (AWS S3, Azure Blob Storage, and compatible services): callers
//! submit get/put/delete/list operations to a bounded queue and a worker
//! pool executes them with pooled connections, retry with backoff, and
//! streaming chunked transfer.

pub mod backend;
pub mod bridge;
pub mod cache;
pub mod config;
pub mod error;
pub mod fault;
pub mod list;
pub mod metrics;
pub mod retry;
pub mod stream;

pub use backend::{
    BackendConfig, ClientError, ListPage, ObjectClient, ObjectEntry, ObjectMetadata,
};
pub use bridge::{
    global, start, Bridge, Completion, Operation, Outcome, Response, StartOutcome, SubmitResult,
    Ticket, RESUBMIT_DELAY,
};
pub use cache::ConnectionCache;
pub use config::{CompressionType, RuntimeConfig, SUBMIT_QUEUE_DEPTH};
pub use error::{Error, ErrorKind, OpKind, Result};
pub use fault::install_fault_reporter;
pub use list::{ListCursor, DEFAULT_PAGE_SIZE};
pub use metrics::{BridgeMetrics, MetricsSnapshot};
pub use retry::RetryClass;
pub use stream::{ObjectReader, ObjectWriter};
