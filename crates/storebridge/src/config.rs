//! Global runtime configuration for the bridge.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Error, Result};

/// Default depth of the submission queue shared by all callers.
pub const SUBMIT_QUEUE_DEPTH: usize = 16 * 1024;

/// Configuration for the bridge runtime.
///
/// All durations accept zero as an explicit "disabled" value where noted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Worker threads backing the pool (0 = one per host core)
    #[serde(default)]
    pub worker_threads: usize,

    /// Depth of the submission queue; a full queue answers submissions
    /// with a try-again signal instead of blocking
    #[serde(default = "default_submit_queue_depth")]
    pub submit_queue_depth: usize,

    /// Maximum simultaneous cached backend clients before eviction
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,

    /// Maximum age of a cached client in seconds (0 disables)
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum idle time of a cached client in seconds (0 disables)
    #[serde(default = "default_cache_tti_secs")]
    pub cache_tti_secs: u64,

    /// Byte size above which a put switches to multipart upload
    #[serde(default = "default_multipart_put_threshold")]
    pub multipart_put_threshold: usize,

    /// Byte size above which a get switches to ranged chunk fetches
    #[serde(default = "default_multipart_get_threshold")]
    pub multipart_get_threshold: usize,

    /// Size of each chunk fetched during a multipart get
    #[serde(default = "default_multipart_get_part_size")]
    pub multipart_get_part_size: usize,

    /// Maximum logical operations in flight at once (admission control,
    /// independent of `worker_threads`)
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Retry attempt cap: a transient failure is retried at most this many
    /// times, so up to `max_retries + 1` attempts are made
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Wall-clock budget for one logical operation's retries, in seconds
    #[serde(default = "default_retry_timeout_secs")]
    pub retry_timeout_secs: u64,
}

fn default_submit_queue_depth() -> usize {
    SUBMIT_QUEUE_DEPTH
}

fn default_cache_capacity() -> u64 {
    20
}

fn default_cache_ttl_secs() -> u64 {
    30 * 60
}

fn default_cache_tti_secs() -> u64 {
    5 * 60
}

fn default_multipart_put_threshold() -> usize {
    8 * 1024 * 1024
}

fn default_multipart_get_threshold() -> usize {
    8 * 1024 * 1024
}

fn default_multipart_get_part_size() -> usize {
    8 * 1024 * 1024
}

fn default_concurrency_limit() -> usize {
    512
}

fn default_max_retries() -> u32 {
    10
}

fn default_retry_timeout_secs() -> u64 {
    150
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            submit_queue_depth: default_submit_queue_depth(),
            cache_capacity: default_cache_capacity(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_tti_secs: default_cache_tti_secs(),
            multipart_put_threshold: default_multipart_put_threshold(),
            multipart_get_threshold: default_multipart_get_threshold(),
            multipart_get_part_size: default_multipart_get_part_size(),
            concurrency_limit: default_concurrency_limit(),
            max_retries: default_max_retries(),
            retry_timeout_secs: default_retry_timeout_secs(),
        }
    }
}

impl RuntimeConfig {
    /// Validate field combinations that cannot work at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.submit_queue_depth == 0 {
            return Err(Error::Config(
                "submit_queue_depth must be at least 1".to_string(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(Error::Config(
                "cache_capacity must be at least 1".to_string(),
            ));
        }
        if self.multipart_get_part_size == 0 {
            return Err(Error::Config(
                "multipart_get_part_size must be non-zero".to_string(),
            ));
        }
        if self.multipart_put_threshold == 0 {
            return Err(Error::Config(
                "multipart_put_threshold must be non-zero".to_string(),
            ));
        }
        if self.concurrency_limit == 0 {
            return Err(Error::Config(
                "concurrency_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Retry wall-clock budget as a [`Duration`].
    pub fn retry_timeout(&self) -> Duration {
        Duration::from_secs(self.retry_timeout_secs)
    }

    /// Cache TTL; `None` when disabled.
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }

    /// Cache TTI; `None` when disabled.
    pub fn cache_tti(&self) -> Option<Duration> {
        (self.cache_tti_secs > 0).then(|| Duration::from_secs(self.cache_tti_secs))
    }
}

/// Compression applied by the stream engine.
///
/// The multipart threshold observes compressed sizes, so compression is
/// applied before any size accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    #[default]
    None,
    Zstd,
}
