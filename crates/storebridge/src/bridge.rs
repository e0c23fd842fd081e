//! The request bridge: the boundary between callers and the worker pool.
//!
//! A caller builds a [`Ticket`], submits it, and waits on the returned
//! [`Completion`]. Acceptance queues the request on a bounded MPMC channel;
//! a dispatch loop on a dedicated runtime executes queued operations with
//! bounded concurrency (admission control, independent of the runtime's
//! thread count), resolving clients through the connection cache and
//! retrying transient failures.
//!
//! Contract per accepted request: exactly one response is written and the
//! completion fires exactly once. The caller may stop waiting at any time;
//! the worker still runs the operation to completion and the response is
//! discarded. Cancellation controls whether the caller waits, not whether
//! the worker finishes.

use async_channel::{Receiver, Sender, TrySendError};
use bytes::Bytes;
use futures_util::StreamExt;
use once_cell::sync::OnceCell;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{info, trace, warn};

use crate::backend::{BackendConfig, ClientError, ListPage, ObjectClient};
use crate::cache::ConnectionCache;
use crate::config::RuntimeConfig;
use crate::error::{Error, ErrorKind, OpKind, Result};
use crate::metrics::{BridgeMetrics, MetricsSnapshot};
use crate::retry::{self, RetryState};

/// How long a caller should back off before resubmitting after
/// [`SubmitResult::TryAgain`].
pub const RESUBMIT_DELAY: Duration = Duration::from_millis(10);

/// One backend operation, as carried across the bridge.
#[derive(Debug)]
pub enum Operation {
    /// Read an object (or a byte range of it) into a buffer of at most
    /// `capacity` bytes.
    Get {
        path: String,
        range: Option<Range<usize>>,
        capacity: usize,
    },
    /// Write an object in a single shot.
    Put { path: String, data: Bytes },
    /// Delete an object.
    Delete { path: String },
    /// List one chunk of keys under a prefix.
    List {
        prefix: String,
        start_after: Option<String>,
        max_entries: usize,
    },
    /// Fetch object metadata.
    Head { path: String },
    /// Begin a multipart upload.
    MultipartStart { path: String },
    /// Upload one part of a multipart upload.
    MultipartPart {
        path: String,
        upload_id: String,
        index: usize,
        data: Bytes,
    },
    /// Commit a multipart upload; `parts` ordered by part index.
    MultipartComplete {
        path: String,
        upload_id: String,
        parts: Vec<String>,
    },
    /// Abandon a multipart upload.
    MultipartAbort { path: String, upload_id: String },
}

impl Operation {
    fn op_kind(&self) -> OpKind {
        match self {
            Operation::Get { .. } => OpKind::Get,
            Operation::Put { .. } => OpKind::Put,
            Operation::Delete { .. } => OpKind::Delete,
            Operation::List { .. } => OpKind::List,
            Operation::Head { .. } => OpKind::Head,
            Operation::MultipartStart { .. } => OpKind::MultipartStart,
            Operation::MultipartPart { .. } => OpKind::MultipartPart,
            Operation::MultipartComplete { .. } => OpKind::MultipartComplete,
            Operation::MultipartAbort { .. } => OpKind::MultipartAbort,
        }
    }
}

/// Success payload of a completed operation.
#[derive(Debug)]
pub enum Outcome {
    Get { data: Bytes },
    Put { length: usize },
    Delete,
    List { page: ListPage },
    Head { size: u64 },
    MultipartStarted { upload_id: String },
    PartUploaded { part_ref: String },
    MultipartCompleted,
    MultipartAborted,
}

/// The result record written by the worker, exactly once per accepted
/// request.
pub type Response = Result<Outcome>;

/// A not-yet-submitted request descriptor.
///
/// On [`SubmitResult::TryAgain`] the ticket is handed back so the caller
/// can resubmit without rebuilding it.
#[derive(Debug)]
pub struct Ticket {
    op: Operation,
    config: Arc<BackendConfig>,
    deadline: Option<Instant>,
}

impl Ticket {
    pub fn get(path: impl Into<String>, capacity: usize, config: Arc<BackendConfig>) -> Self {
        Self::new(
            Operation::Get {
                path: path.into(),
                range: None,
                capacity,
            },
            config,
        )
    }

    pub fn get_range(
        path: impl Into<String>,
        range: Range<usize>,
        config: Arc<BackendConfig>,
    ) -> Self {
        let capacity = range.end.saturating_sub(range.start);
        Self::new(
            Operation::Get {
                path: path.into(),
                range: Some(range),
                capacity,
            },
            config,
        )
    }

    pub fn put(path: impl Into<String>, data: Bytes, config: Arc<BackendConfig>) -> Self {
        Self::new(
            Operation::Put {
                path: path.into(),
                data,
            },
            config,
        )
    }

    pub fn delete(path: impl Into<String>, config: Arc<BackendConfig>) -> Self {
        Self::new(Operation::Delete { path: path.into() }, config)
    }

    pub fn list(
        prefix: impl Into<String>,
        start_after: Option<String>,
        max_entries: usize,
        config: Arc<BackendConfig>,
    ) -> Self {
        Self::new(
            Operation::List {
                prefix: prefix.into(),
                start_after,
                max_entries,
            },
            config,
        )
    }

    pub fn head(path: impl Into<String>, config: Arc<BackendConfig>) -> Self {
        Self::new(Operation::Head { path: path.into() }, config)
    }

    pub(crate) fn new(op: Operation, config: Arc<BackendConfig>) -> Self {
        Self {
            op,
            config,
            deadline: None,
        }
    }

    /// Cap retries of this operation by an external deadline, shared with
    /// sibling sub-operations of the same logical operation.
    pub(crate) fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// A queued request: a ticket plus its completion signal.
struct Request {
    op: Operation,
    config: Arc<BackendConfig>,
    deadline: Option<Instant>,
    completion: oneshot::Sender<Response>,
}

impl From<Request> for Ticket {
    fn from(request: Request) -> Self {
        Ticket {
            op: request.op,
            config: request.config,
            deadline: request.deadline,
        }
    }
}

/// The caller's half of the completion signal.
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Response>,
}

impl Completion {
    /// Suspend until the worker writes the response.
    ///
    /// Dropping a `Completion` instead of waiting is the supported
    /// cancellation path: the worker runs to completion and its response
    /// is discarded.
    pub async fn wait(self) -> Result<Outcome> {
        match self.rx.await {
            Ok(response) => response,
            Err(_) => Err(Error::CompletionLost),
        }
    }
}

/// Result of a submission attempt.
#[derive(Debug)]
pub enum SubmitResult {
    /// Queued; wait on the completion.
    Accepted(Completion),
    /// The queue is momentarily full. Not an error: back off briefly
    /// (see [`RESUBMIT_DELAY`]) and resubmit the returned ticket.
    TryAgain(Ticket),
    /// The pool is shut down; fatal for this request.
    Closed(Ticket),
}

struct Inner {
    tx: Sender<Request>,
    metrics: Arc<BridgeMetrics>,
    config: RuntimeConfig,
}

/// Handle to a running bridge.
///
/// Cloning is cheap; dropping the last clone closes the queue and the pool
/// drains in-flight work before shutting down.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<Inner>,
}

impl Bridge {
    /// Start a bridge with its own worker runtime.
    pub fn start(config: RuntimeConfig) -> Result<Bridge> {
        config.validate()?;

        let (tx, rx) = async_channel::bounded(config.submit_queue_depth);
        let metrics = Arc::new(BridgeMetrics::new());
        let cache = Arc::new(ConnectionCache::new(
            config.cache_capacity,
            config.cache_ttl(),
            config.cache_tti(),
        ));

        let mut builder = tokio::runtime::Builder::new_multi_thread();
        if config.worker_threads > 0 {
            builder.worker_threads(config.worker_threads);
        }
        let runtime = builder
            .enable_all()
            .thread_name("storebridge-worker")
            .build()
            .map_err(|e| Error::Init(format!("Failed to build worker runtime: {}", e)))?;

        let pool_config = config.clone();
        let pool_metrics = metrics.clone();
        std::thread::Builder::new()
            .name("storebridge-pool".to_string())
            .spawn(move || {
                runtime.block_on(dispatch(rx, cache, pool_metrics, pool_config));
            })
            .map_err(|e| Error::Init(format!("Failed to spawn pool thread: {}", e)))?;

        info!(
            "Bridge started: worker_threads={}, concurrency_limit={}, queue_depth={}",
            config.worker_threads, config.concurrency_limit, config.submit_queue_depth
        );
        Ok(Bridge {
            inner: Arc::new(Inner {
                tx,
                metrics,
                config,
            }),
        })
    }

    /// Submit a ticket without blocking.
    pub fn try_submit(&self, ticket: Ticket) -> SubmitResult {
        let (tx, rx) = oneshot::channel();
        let request = Request {
            op: ticket.op,
            config: ticket.config,
            deadline: ticket.deadline,
            completion: tx,
        };
        match self.inner.tx.try_send(request) {
            Ok(()) => {
                self.inner.metrics.record_submitted();
                SubmitResult::Accepted(Completion { rx })
            }
            Err(TrySendError::Full(request)) => SubmitResult::TryAgain(request.into()),
            Err(TrySendError::Closed(request)) => SubmitResult::Closed(request.into()),
        }
    }

    /// Submit, resubmitting on backpressure until accepted.
    pub async fn submit(&self, mut ticket: Ticket) -> Result<Completion> {
        loop {
            match self.try_submit(ticket) {
                SubmitResult::Accepted(completion) => return Ok(completion),
                SubmitResult::TryAgain(returned) => {
                    ticket = returned;
                    tokio::time::sleep(RESUBMIT_DELAY).await;
                }
                SubmitResult::Closed(_) => return Err(Error::ChannelClosed),
            }
        }
    }

    /// Submit and wait for the outcome.
    pub async fn execute(&self, ticket: Ticket) -> Result<Outcome> {
        self.submit(ticket).await?.wait().await
    }

    /// Read a whole object into an owned buffer of at most `capacity`
    /// bytes.
    pub async fn get(
        &self,
        path: &str,
        capacity: usize,
        config: &Arc<BackendConfig>,
    ) -> Result<Bytes> {
        match self
            .execute(Ticket::get(path, capacity, config.clone()))
            .await?
        {
            Outcome::Get { data } => Ok(data),
            _ => unreachable!("worker wrote a mismatched outcome for a get"),
        }
    }

    /// Write an object in a single shot.
    pub async fn put(&self, path: &str, data: Bytes, config: &Arc<BackendConfig>) -> Result<usize> {
        match self.execute(Ticket::put(path, data, config.clone())).await? {
            Outcome::Put { length } => Ok(length),
            _ => unreachable!("worker wrote a mismatched outcome for a put"),
        }
    }

    /// Delete an object.
    pub async fn delete(&self, path: &str, config: &Arc<BackendConfig>) -> Result<()> {
        match self.execute(Ticket::delete(path, config.clone())).await? {
            Outcome::Delete => Ok(()),
            _ => unreachable!("worker wrote a mismatched outcome for a delete"),
        }
    }

    /// List one chunk of keys under a prefix.
    pub async fn list(
        &self,
        prefix: &str,
        start_after: Option<String>,
        max_entries: usize,
        config: &Arc<BackendConfig>,
    ) -> Result<ListPage> {
        match self
            .execute(Ticket::list(prefix, start_after, max_entries, config.clone()))
            .await?
        {
            Outcome::List { page } => Ok(page),
            _ => unreachable!("worker wrote a mismatched outcome for a list"),
        }
    }

    /// Close the submission queue. In-flight and already-queued requests
    /// still complete; new submissions observe [`SubmitResult::Closed`].
    pub fn close(&self) {
        self.inner.tx.close();
    }

    /// Runtime configuration this bridge was started with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Point-in-time counters for this bridge.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}

async fn dispatch(
    rx: Receiver<Request>,
    cache: Arc<ConnectionCache>,
    metrics: Arc<BridgeMetrics>,
    config: RuntimeConfig,
) {
    let limit = config.concurrency_limit;
    rx.for_each_concurrent(limit, |request| {
        let cache = cache.clone();
        let metrics = metrics.clone();
        let config = config.clone();
        async move {
            handle_request(request, &cache, &metrics, &config).await;
        }
    })
    .await;
    info!("Bridge worker pool drained, shutting down");
}

async fn handle_request(
    request: Request,
    cache: &ConnectionCache,
    metrics: &BridgeMetrics,
    config: &RuntimeConfig,
) {
    let Request {
        op,
        config: backend,
        deadline,
        completion,
    } = request;

    let response = match cache.get_or_create(&backend).await {
        Ok(client) => run_operation(client.as_ref(), op, deadline, config, metrics).await,
        Err(err) => Err(err),
    };

    match &response {
        Ok(_) => metrics.record_completed(),
        Err(err) => {
            warn!("{}", err);
            metrics.record_failed();
        }
    }

    // The caller may have stopped waiting; the response is then dropped
    // here and nothing else observes it.
    if completion.send(response).is_err() {
        metrics.record_abandoned();
        trace!("Caller abandoned the wait; response discarded");
    }
}

/// Execute one operation against a resolved client, retrying transient
/// failures within the configured budget.
pub(crate) async fn run_operation(
    client: &dyn ObjectClient,
    op: Operation,
    deadline: Option<Instant>,
    config: &RuntimeConfig,
    metrics: &BridgeMetrics,
) -> Response {
    let op_kind = op.op_kind();
    let mut state = RetryState::new(config.max_retries, config.retry_timeout());
    if let Some(deadline) = deadline {
        state = state.with_deadline(deadline);
    }

    match op {
        Operation::Get {
            path,
            range,
            capacity,
        } => {
            let result = retry::run(&mut state, || client.get(&path, range.clone())).await;
            let data = result.map_err(|e| operation_error(op_kind, &state, e))?;
            if data.len() > capacity {
                return Err(Error::Operation {
                    op: op_kind,
                    kind: ErrorKind::BufferTooSmall,
                    message: format!(
                        "object at {} is {} bytes but the destination buffer holds {}",
                        path,
                        data.len(),
                        capacity
                    ),
                    attempts: state.attempts(),
                });
            }
            metrics.record_download(data.len() as u64);
            Ok(Outcome::Get { data })
        }
        Operation::Put { path, data } => {
            let length = data.len();
            let result = retry::run(&mut state, || client.put(&path, data.clone())).await;
            result.map_err(|e| operation_error(op_kind, &state, e))?;
            metrics.record_upload(length as u64);
            Ok(Outcome::Put { length })
        }
        Operation::Delete { path } => {
            let result = retry::run(&mut state, || client.delete(&path)).await;
            result.map_err(|e| operation_error(op_kind, &state, e))?;
            Ok(Outcome::Delete)
        }
        Operation::List {
            prefix,
            start_after,
            max_entries,
        } => {
            let result = retry::run(&mut state, || {
                client.list_page(&prefix, start_after.as_deref(), max_entries)
            })
            .await;
            let page = result.map_err(|e| operation_error(op_kind, &state, e))?;
            Ok(Outcome::List { page })
        }
        Operation::Head { path } => {
            let result = retry::run(&mut state, || client.head(&path)).await;
            let meta = result.map_err(|e| operation_error(op_kind, &state, e))?;
            Ok(Outcome::Head { size: meta.size })
        }
        Operation::MultipartStart { path } => {
            let result = retry::run(&mut state, || client.multipart_start(&path)).await;
            let upload_id = result.map_err(|e| operation_error(op_kind, &state, e))?;
            Ok(Outcome::MultipartStarted { upload_id })
        }
        Operation::MultipartPart {
            path,
            upload_id,
            index,
            data,
        } => {
            let length = data.len();
            let result = retry::run(&mut state, || {
                client.multipart_put_part(&path, &upload_id, index, data.clone())
            })
            .await;
            let part_ref = result.map_err(|e| operation_error(op_kind, &state, e))?;
            metrics.record_upload(length as u64);
            Ok(Outcome::PartUploaded { part_ref })
        }
        Operation::MultipartComplete {
            path,
            upload_id,
            parts,
        } => {
            let result = retry::run(&mut state, || {
                client.multipart_complete(&path, &upload_id, parts.clone())
            })
            .await;
            result.map_err(|e| operation_error(op_kind, &state, e))?;
            Ok(Outcome::MultipartCompleted)
        }
        Operation::MultipartAbort { path, upload_id } => {
            let result = retry::run(&mut state, || client.multipart_abort(&path, &upload_id)).await;
            result.map_err(|e| operation_error(op_kind, &state, e))?;
            Ok(Outcome::MultipartAborted)
        }
    }
}

fn operation_error(op: OpKind, state: &RetryState, err: ClientError) -> Error {
    Error::Operation {
        op,
        kind: retry::kind_of(&err),
        message: err.to_string(),
        attempts: state.attempts(),
    }
}

static GLOBAL: OnceCell<Bridge> = OnceCell::new();

/// Outcome of [`start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The global bridge was started with the given configuration.
    Started,
    /// A bridge was already running; the new configuration was ignored.
    /// Not an error.
    AlreadyStarted,
}

/// Start the process-global bridge. Idempotent-once: the first call wins,
/// later calls return [`StartOutcome::AlreadyStarted`] without altering
/// configuration.
pub fn start(config: RuntimeConfig) -> Result<StartOutcome> {
    let mut outcome = StartOutcome::AlreadyStarted;
    GLOBAL.get_or_try_init(|| -> Result<Bridge> {
        let bridge = Bridge::start(config)?;
        outcome = StartOutcome::Started;
        Ok(bridge)
    })?;
    if outcome == StartOutcome::AlreadyStarted {
        warn!("start() called with the runtime already started; configuration ignored");
    }
    Ok(outcome)
}

/// The process-global bridge, if started.
pub fn global() -> Option<&'static Bridge> {
    GLOBAL.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Client whose get fails with a fixed error a configurable number of
    /// times (u32::MAX = always), counting attempts.
    struct FlakyClient {
        failures: u32,
        code: u16,
        attempts: AtomicU32,
    }

    impl FlakyClient {
        fn new(failures: u32, code: u16) -> Self {
            Self {
                failures,
                code,
                attempts: AtomicU32::new(0),
            }
        }

        fn fail(&self) -> ClientError {
            ClientError::Status {
                code: self.code,
                message: format!("injected {}", self.code),
            }
        }
    }

    #[async_trait]
    impl ObjectClient for FlakyClient {
        async fn get(
            &self,
            _path: &str,
            _range: Option<Range<usize>>,
        ) -> crate::backend::ClientResult<Bytes> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                Err(self.fail())
            } else {
                Ok(Bytes::from("payload"))
            }
        }

        async fn head(
            &self,
            _path: &str,
        ) -> crate::backend::ClientResult<crate::backend::ObjectMetadata> {
            Err(self.fail())
        }

        async fn put(&self, _path: &str, _data: Bytes) -> crate::backend::ClientResult<()> {
            Err(self.fail())
        }

        async fn delete(&self, _path: &str) -> crate::backend::ClientResult<()> {
            Err(self.fail())
        }

        async fn list_page(
            &self,
            _prefix: &str,
            _start_after: Option<&str>,
            _max_entries: usize,
        ) -> crate::backend::ClientResult<ListPage> {
            Err(self.fail())
        }

        async fn multipart_start(&self, _path: &str) -> crate::backend::ClientResult<String> {
            Err(self.fail())
        }

        async fn multipart_put_part(
            &self,
            _path: &str,
            _upload_id: &str,
            _index: usize,
            _data: Bytes,
        ) -> crate::backend::ClientResult<String> {
            Err(self.fail())
        }

        async fn multipart_complete(
            &self,
            _path: &str,
            _upload_id: &str,
            _parts: Vec<String>,
        ) -> crate::backend::ClientResult<()> {
            Err(self.fail())
        }

        async fn multipart_abort(
            &self,
            _path: &str,
            _upload_id: &str,
        ) -> crate::backend::ClientResult<()> {
            Err(self.fail())
        }
    }

    fn test_config(max_retries: u32) -> RuntimeConfig {
        RuntimeConfig {
            max_retries,
            retry_timeout_secs: 3600,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_accounting_through_worker() {
        let client = FlakyClient::new(u32::MAX, 500);
        let metrics = BridgeMetrics::new();
        let op = Operation::Get {
            path: "x".to_string(),
            range: None,
            capacity: 1024,
        };

        let err = run_operation(&client, op, None, &test_config(3), &metrics)
            .await
            .unwrap_err();
        assert_eq!(client.attempts.load(Ordering::SeqCst), 4);
        assert_eq!(err.kind(), Some(ErrorKind::StatusCode(500)));
        assert!(err.to_string().contains("injected 500"));
    }

    #[tokio::test]
    async fn test_non_retryable_single_attempt() {
        let client = FlakyClient::new(u32::MAX, 404);
        let metrics = BridgeMetrics::new();
        let op = Operation::Get {
            path: "x".to_string(),
            range: None,
            capacity: 1024,
        };

        let err = run_operation(&client, op, None, &test_config(10), &metrics)
            .await
            .unwrap_err();
        assert_eq!(client.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(err.kind(), Some(ErrorKind::StatusCode(404)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_within_budget() {
        let client = FlakyClient::new(2, 503);
        let metrics = BridgeMetrics::new();
        let op = Operation::Get {
            path: "x".to_string(),
            range: None,
            capacity: 1024,
        };

        let outcome = run_operation(&client, op, None, &test_config(5), &metrics)
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Get { data } if data == Bytes::from("payload")));
        assert_eq!(client.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(metrics.snapshot().bytes_downloaded, 7);
    }

    #[tokio::test]
    async fn test_buffer_too_small_surfaces_without_retry() {
        let client = FlakyClient::new(0, 500);
        let metrics = BridgeMetrics::new();
        let op = Operation::Get {
            path: "x".to_string(),
            range: None,
            capacity: 3, // "payload" is 7 bytes
        };

        let err = run_operation(&client, op, None, &test_config(5), &metrics)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::BufferTooSmall));
        assert_eq!(client.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_closed_bridge_rejects_submissions() {
        let bridge = Bridge::start(RuntimeConfig::default()).unwrap();
        bridge.close();
        let ticket = Ticket::delete("x", Arc::new(BackendConfig::Memory));
        assert!(matches!(
            bridge.try_submit(ticket),
            SubmitResult::Closed(_)
        ));
    }

    #[tokio::test]
    async fn test_backpressure_try_again_and_resubmission() {
        // Depth 1 plus a single-operation admission limit: while one put
        // is in flight and one is queued, the next submission observes a
        // full queue.
        let bridge = Bridge::start(RuntimeConfig {
            submit_queue_depth: 1,
            concurrency_limit: 1,
            ..Default::default()
        })
        .unwrap();
        let config = Arc::new(BackendConfig::Memory);

        let mut completions = Vec::new();
        let mut saw_backpressure = false;
        for i in 0..200 {
            let ticket = Ticket::put(format!("bp/{}", i), Bytes::from_static(b"v"), config.clone());
            match bridge.try_submit(ticket) {
                SubmitResult::Accepted(completion) => completions.push(completion),
                SubmitResult::TryAgain(returned) => {
                    saw_backpressure = true;
                    // The resubmit loop gets the returned ticket through
                    // once the queue drains.
                    completions.push(bridge.submit(returned).await.unwrap());
                }
                SubmitResult::Closed(_) => panic!("pool closed mid-test"),
            }
        }
        assert!(saw_backpressure);
        for completion in completions {
            completion.wait().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_abandoned_wait_is_tolerated() {
        let bridge = Bridge::start(RuntimeConfig::default()).unwrap();
        let config = Arc::new(BackendConfig::Memory);

        let ticket = Ticket::put("k", Bytes::from("v"), config.clone());
        let SubmitResult::Accepted(completion) = bridge.try_submit(ticket) else {
            panic!("submission rejected");
        };
        // Stop observing before the worker responds.
        drop(completion);

        // The worker still completed the put; a later get sees the object.
        let mut waited = Duration::ZERO;
        loop {
            match bridge.get("k", 16, &config).await {
                Ok(data) => {
                    assert_eq!(data, Bytes::from("v"));
                    break;
                }
                Err(_) if waited < Duration::from_secs(5) => {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    waited += Duration::from_millis(10);
                }
                Err(err) => panic!("abandoned put never landed: {}", err),
            }
        }
    }
}
