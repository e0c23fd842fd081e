//! S3-compatible client construction.

use object_store::aws::{AmazonS3Builder, AmazonS3ConfigKey};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::store::ObjectStoreClient;
use super::{client_options, BackendConfig};
use crate::{Error, Result};

/// Build a client for [`BackendConfig::S3`].
pub(super) fn connect(config: &BackendConfig) -> Result<ObjectStoreClient> {
    let BackendConfig::S3 {
        bucket,
        region,
        endpoint,
        access_key_id,
        secret_access_key,
        session_token,
        allow_http,
    } = config
    else {
        return Err(Error::Config("expected an S3 configuration".to_string()));
    };

    let mut builder = AmazonS3Builder::new()
        .with_bucket_name(bucket)
        .with_client_options(client_options());

    if let Some(region) = region {
        builder = builder.with_region(region);
    }
    if let Some(endpoint) = endpoint {
        builder = builder.with_endpoint(endpoint);
        // Custom endpoints (MinIO, Ceph RGW) need path-style addressing.
        builder = builder.with_virtual_hosted_style_request(false);
    }
    if let Some(access_key_id) = access_key_id {
        builder = builder.with_access_key_id(access_key_id);
        debug!("S3 authentication: static credentials");
    }
    if let Some(secret_access_key) = secret_access_key {
        builder = builder.with_secret_access_key(secret_access_key);
    }
    if let Some(session_token) = session_token {
        builder = builder.with_token(session_token);
    }
    if *allow_http {
        builder = builder.with_allow_http(true);
    }

    let store = builder
        .build()
        .map_err(|e| Error::Connect(format!("Failed to create S3 client: {}", e)))?;
    Ok(ObjectStoreClient::from_store(Arc::new(store)))
}

/// Build a client for an `s3://` Snowflake stage URL with a passthrough
/// option map.
pub(super) fn connect_stage(url: &str, options: &BTreeMap<String, String>) -> Result<ObjectStoreClient> {
    let mut builder = AmazonS3Builder::new()
        .with_url(url)
        .with_client_options(client_options());

    for (key, value) in options {
        match key.parse::<AmazonS3ConfigKey>() {
            Ok(config_key) => builder = builder.with_config(config_key, value),
            Err(_) => warn!("Ignoring unknown S3 stage option: {}", key),
        }
    }

    let store = builder
        .build()
        .map_err(|e| Error::Connect(format!("Failed to create S3 stage client: {}", e)))?;
    Ok(ObjectStoreClient::from_store(Arc::new(store)))
}
