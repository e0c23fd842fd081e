//! Azure Blob Storage client construction.

use object_store::azure::{AzureConfigKey, MicrosoftAzureBuilder};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::store::ObjectStoreClient;
use super::{client_options, BackendConfig};
use crate::{Error, Result};

/// Build a client for [`BackendConfig::Azure`].
pub(super) fn connect(config: &BackendConfig) -> Result<ObjectStoreClient> {
    let BackendConfig::Azure {
        account,
        container,
        access_key,
        sas_token,
        endpoint,
        allow_http,
    } = config
    else {
        return Err(Error::Config("expected an Azure configuration".to_string()));
    };

    let mut builder = MicrosoftAzureBuilder::new()
        .with_account(account)
        .with_container_name(container)
        .with_client_options(client_options());

    if let Some(key) = access_key {
        builder = builder.with_access_key(key);
        debug!("Azure authentication: account key");
    } else if let Some(sas_token) = sas_token {
        // SAS token authentication; the token is a query string of
        // key-value pairs.
        let pairs: Vec<(String, String)> = sas_token
            .trim_start_matches('?')
            .split('&')
            .filter_map(|pair| {
                let mut parts = pair.splitn(2, '=');
                match (parts.next(), parts.next()) {
                    (Some(k), Some(v)) => Some((k.to_string(), v.to_string())),
                    _ => None,
                }
            })
            .collect();
        builder = builder.with_sas_authorization(pairs);
        debug!("Azure authentication: SAS token");
    } else {
        debug!("Azure authentication: default credential chain");
    }

    if let Some(endpoint) = endpoint {
        builder = builder.with_endpoint(endpoint.clone());
    }
    if *allow_http {
        builder = builder.with_allow_http(true);
    }

    let store = builder
        .build()
        .map_err(|e| Error::Connect(format!("Failed to create Azure client: {}", e)))?;
    Ok(ObjectStoreClient::from_store(Arc::new(store)))
}

/// Build a client for an `azure://` Snowflake stage URL with a passthrough
/// option map.
pub(super) fn connect_stage(url: &str, options: &BTreeMap<String, String>) -> Result<ObjectStoreClient> {
    let mut builder = MicrosoftAzureBuilder::new()
        .with_url(url)
        .with_client_options(client_options());

    for (key, value) in options {
        match key.parse::<AzureConfigKey>() {
            Ok(config_key) => builder = builder.with_config(config_key, value),
            Err(_) => warn!("Ignoring unknown Azure stage option: {}", key),
        }
    }

    let store = builder
        .build()
        .map_err(|e| Error::Connect(format!("Failed to create Azure stage client: {}", e)))?;
    Ok(ObjectStoreClient::from_store(Arc::new(store)))
}
