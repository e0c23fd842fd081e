//! Backend client abstraction and provider implementations.
//!
//! One [`ObjectClient`] per connection-cache entry, constructed from a
//! [`BackendConfig`] and shared by workers via `Arc`:
//!
//! - **Azure**: Azure Blob Storage
//! - **S3**: AWS S3 and S3-compatible services (MinIO, Ceph RGW, etc.)
//! - **SnowflakeStage**: a stage URL routed to the matching provider
//! - **Memory**: in-memory storage (for testing)

mod azure;
mod client;
mod config;
mod s3;
mod store;

pub use client::{
    ClientError, ClientResult, ListPage, ObjectClient, ObjectEntry, ObjectMetadata,
};
pub use config::{AzureBuilder, BackendConfig, S3Builder, SnowflakeStageBuilder};
pub use store::ObjectStoreClient;

use object_store::memory::InMemory;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::{Error, Result};

/// Per-attempt HTTP request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
/// TCP connect timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn client_options() -> object_store::ClientOptions {
    object_store::ClientOptions::new()
        .with_timeout(REQUEST_TIMEOUT)
        .with_connect_timeout(CONNECT_TIMEOUT)
}

/// Construct a backend client for a configuration.
///
/// This is the construction path behind every connection-cache miss; the
/// cache guarantees it runs at most once per fingerprint at a time.
pub fn connect(config: &BackendConfig) -> Result<Arc<dyn ObjectClient>> {
    config.validate()?;
    let client = match config {
        BackendConfig::Azure { .. } => azure::connect(config)?,
        BackendConfig::S3 { .. } => s3::connect(config)?,
        BackendConfig::SnowflakeStage { url, options } => {
            let parsed = url::Url::parse(url)
                .map_err(|e| Error::Config(format!("Invalid stage URL: {}", e)))?;
            match parsed.scheme() {
                "s3" | "s3a" => s3::connect_stage(url, options)?,
                "azure" | "az" | "abfs" | "abfss" => azure::connect_stage(url, options)?,
                scheme => {
                    return Err(Error::Config(format!(
                        "Unsupported stage scheme: {}",
                        scheme
                    )))
                }
            }
        }
        BackendConfig::Memory => ObjectStoreClient::from_store(Arc::new(InMemory::new())),
    };
    info!("Created backend client for {}", config.url());
    Ok(Arc::new(client))
}
