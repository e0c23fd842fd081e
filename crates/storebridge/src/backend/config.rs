//! Backend configuration types and cache fingerprinting.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::Hasher;

use crate::{Error, Result};

/// Parameter keys that do not affect connection identity.
///
/// Two configurations differing only in these keys map to the same cached
/// client.
const NON_IDENTITY_PARAMS: &[&str] = &["timeout", "connect_timeout", "max_retries", "retry_timeout"];

/// Backend configuration using a tagged enum, one variant per provider.
///
/// Every variant normalizes to a `(url, parameter map)` pair consumed
/// uniformly by the connection layer; the pair also seeds the cache
/// fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider")]
pub enum BackendConfig {
    /// Azure Blob Storage
    #[serde(rename = "azure")]
    Azure {
        /// Storage account name
        account: String,
        /// Blob container name
        container: String,
        /// Storage account key
        #[serde(default)]
        access_key: Option<String>,
        /// SAS token query string (mutually exclusive with `access_key`)
        #[serde(default)]
        sas_token: Option<String>,
        /// Custom endpoint (emulator or sovereign cloud)
        #[serde(default)]
        endpoint: Option<String>,
        /// Allow HTTP (insecure) connections
        #[serde(default)]
        allow_http: bool,
    },

    /// AWS S3 or S3-compatible storage
    #[serde(rename = "s3")]
    S3 {
        /// Bucket name
        bucket: String,
        /// AWS region
        #[serde(default)]
        region: Option<String>,
        /// Custom endpoint (MinIO and friends)
        #[serde(default)]
        endpoint: Option<String>,
        /// Access key id
        #[serde(default)]
        access_key_id: Option<String>,
        /// Secret access key
        #[serde(default)]
        secret_access_key: Option<String>,
        /// Session token for temporary credentials
        #[serde(default)]
        session_token: Option<String>,
        /// Allow HTTP (insecure) connections
        #[serde(default)]
        allow_http: bool,
    },

    /// A Snowflake stage location: a provider URL plus an opaque
    /// provider-specific option map, passed through to the store builder.
    #[serde(rename = "snowflake_stage")]
    SnowflakeStage {
        /// Stage destination URL (`s3://...` or `azure://...`)
        url: String,
        /// Provider-specific options (credentials, endpoint overrides)
        #[serde(default)]
        options: BTreeMap<String, String>,
    },

    /// In-memory storage (for testing)
    #[serde(rename = "memory")]
    Memory,
}

impl BackendConfig {
    /// Start building an Azure configuration.
    pub fn azure(account: impl Into<String>, container: impl Into<String>) -> AzureBuilder {
        AzureBuilder {
            account: account.into(),
            container: container.into(),
            access_key: None,
            sas_token: None,
            endpoint: None,
            allow_http: false,
        }
    }

    /// Start building an S3 configuration.
    pub fn s3(bucket: impl Into<String>) -> S3Builder {
        S3Builder {
            bucket: bucket.into(),
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            allow_http: false,
        }
    }

    /// Start building a Snowflake stage configuration.
    pub fn snowflake_stage(url: impl Into<String>) -> SnowflakeStageBuilder {
        SnowflakeStageBuilder {
            url: url.into(),
            options: BTreeMap::new(),
        }
    }

    /// Parse configuration from a URL string.
    ///
    /// Supported formats:
    /// - `s3://bucket-name?region=us-east-1`
    /// - `azure://container@account`
    /// - `memory://`
    pub fn from_url(raw: &str) -> Result<Self> {
        let parsed = url::Url::parse(raw)
            .map_err(|e| Error::Config(format!("Invalid backend URL: {}", e)))?;

        match parsed.scheme() {
            "s3" | "s3a" => {
                let bucket = parsed.host_str().unwrap_or_default().to_string();
                let region = parsed
                    .query_pairs()
                    .find(|(k, _)| k == "region")
                    .map(|(_, v)| v.to_string());
                let endpoint = parsed
                    .query_pairs()
                    .find(|(k, _)| k == "endpoint")
                    .map(|(_, v)| v.to_string());
                Ok(Self::S3 {
                    bucket,
                    region,
                    endpoint,
                    access_key_id: None,
                    secret_access_key: None,
                    session_token: None,
                    allow_http: false,
                })
            }
            "azure" | "az" => {
                let account = parsed.username().to_string();
                let (account, container) = if account.is_empty() {
                    // azure://account/container form
                    let account = parsed.host_str().unwrap_or_default().to_string();
                    let container = parsed.path().trim_start_matches('/').to_string();
                    (account, container)
                } else {
                    // azure://container@account form
                    let container = account;
                    let account = parsed.host_str().unwrap_or_default().to_string();
                    (account, container)
                };
                Ok(Self::Azure {
                    account,
                    container,
                    access_key: None,
                    sas_token: None,
                    endpoint: None,
                    allow_http: false,
                })
            }
            "memory" => Ok(Self::Memory),
            scheme => Err(Error::Config(format!("Unknown backend scheme: {}", scheme))),
        }
    }

    /// Normalized destination URL (scheme + container/bucket root).
    pub fn url(&self) -> String {
        match self {
            Self::Azure {
                account, container, ..
            } => format!("azure://{}@{}", container, account),
            Self::S3 { bucket, .. } => format!("s3://{}", bucket),
            Self::SnowflakeStage { url, .. } => url.clone(),
            Self::Memory => "memory://".to_string(),
        }
    }

    /// Ordered parameter map for this configuration.
    ///
    /// Keys use the `object_store` builder vocabulary where one exists.
    pub fn params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        match self {
            Self::Azure {
                access_key,
                sas_token,
                endpoint,
                allow_http,
                ..
            } => {
                if let Some(key) = access_key {
                    params.insert("azure_storage_access_key".to_string(), key.clone());
                }
                if let Some(token) = sas_token {
                    params.insert("azure_storage_sas_token".to_string(), token.clone());
                }
                if let Some(endpoint) = endpoint {
                    params.insert("endpoint".to_string(), endpoint.clone());
                }
                if *allow_http {
                    params.insert("allow_http".to_string(), "true".to_string());
                }
            }
            Self::S3 {
                region,
                endpoint,
                access_key_id,
                secret_access_key,
                session_token,
                allow_http,
                ..
            } => {
                if let Some(region) = region {
                    params.insert("region".to_string(), region.clone());
                }
                if let Some(endpoint) = endpoint {
                    params.insert("endpoint".to_string(), endpoint.clone());
                }
                if let Some(id) = access_key_id {
                    params.insert("aws_access_key_id".to_string(), id.clone());
                }
                if let Some(secret) = secret_access_key {
                    params.insert("aws_secret_access_key".to_string(), secret.clone());
                }
                if let Some(token) = session_token {
                    params.insert("aws_session_token".to_string(), token.clone());
                }
                if *allow_http {
                    params.insert("allow_http".to_string(), "true".to_string());
                }
            }
            Self::SnowflakeStage { options, .. } => {
                params.extend(options.clone());
            }
            Self::Memory => {}
        }
        params
    }

    /// Deterministic cache key derived from the URL and the
    /// identity-relevant parameters.
    ///
    /// Two independently constructed configurations with equal fingerprints
    /// are cache-interchangeable.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        hasher.write(self.url().as_bytes());
        for (key, value) in self.params() {
            if NON_IDENTITY_PARAMS.contains(&key.as_str()) {
                continue;
            }
            hasher.write(key.as_bytes());
            hasher.write(b"=");
            hasher.write(value.as_bytes());
            hasher.write(b";");
        }
        hasher.finish()
    }

    /// Validate credential combinations.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Azure {
                access_key: Some(_),
                sas_token: Some(_),
                ..
            } => Err(Error::Config(
                "Azure access_key and sas_token are mutually exclusive".to_string(),
            )),
            Self::Azure {
                account, container, ..
            } if account.is_empty() || container.is_empty() => Err(Error::Config(
                "Azure account and container are required".to_string(),
            )),
            Self::S3 { bucket, .. } if bucket.is_empty() => {
                Err(Error::Config("S3 bucket is required".to_string()))
            }
            Self::S3 {
                access_key_id,
                secret_access_key,
                ..
            } if access_key_id.is_some() != secret_access_key.is_some() => Err(Error::Config(
                "S3 access_key_id and secret_access_key must be set together".to_string(),
            )),
            Self::SnowflakeStage { url, .. } if url.is_empty() => {
                Err(Error::Config("Snowflake stage URL is required".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// Builder for [`BackendConfig::Azure`].
#[derive(Debug, Clone)]
pub struct AzureBuilder {
    account: String,
    container: String,
    access_key: Option<String>,
    sas_token: Option<String>,
    endpoint: Option<String>,
    allow_http: bool,
}

impl AzureBuilder {
    pub fn with_access_key(mut self, key: impl Into<String>) -> Self {
        self.access_key = Some(key.into());
        self
    }

    pub fn with_sas_token(mut self, token: impl Into<String>) -> Self {
        self.sas_token = Some(token.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<BackendConfig> {
        let config = BackendConfig::Azure {
            account: self.account,
            container: self.container,
            access_key: self.access_key,
            sas_token: self.sas_token,
            endpoint: self.endpoint,
            allow_http: self.allow_http,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Builder for [`BackendConfig::S3`].
#[derive(Debug, Clone)]
pub struct S3Builder {
    bucket: String,
    region: Option<String>,
    endpoint: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    session_token: Option<String>,
    allow_http: bool,
}

impl S3Builder {
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<BackendConfig> {
        let config = BackendConfig::S3 {
            bucket: self.bucket,
            region: self.region,
            endpoint: self.endpoint,
            access_key_id: self.access_key_id,
            secret_access_key: self.secret_access_key,
            session_token: self.session_token,
            allow_http: self.allow_http,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Builder for [`BackendConfig::SnowflakeStage`].
#[derive(Debug, Clone)]
pub struct SnowflakeStageBuilder {
    url: String,
    options: BTreeMap<String, String>,
}

impl SnowflakeStageBuilder {
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<BackendConfig> {
        let config = BackendConfig::SnowflakeStage {
            url: self.url,
            options: self.options,
        };
        config.validate()?;
        Ok(config)
    }
}
