//! Configured connection to the object store

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::CosConfig;
use crate::cos::resolve::{endpoint_from_document, EndpointDirectory, HttpDirectory};
use crate::cos::sdk::SdkStore;
use crate::cos::store::ObjectStore;
use crate::cos::types::UrlType;
use crate::error::{CosError, Result};

/// Endpoint kind looked up by [`CosClient::url_from_location_default`]
pub const DEFAULT_URL_TYPE: UrlType = UrlType::Public;

/// Shared handle to the object store, built from a [`CosConfig`].
///
/// Cloning is cheap; every role (`CosAdmin`, `CosReader`, `CosWriter`) holds
/// one.
#[derive(Clone)]
pub struct CosClient {
    store: Arc<dyn ObjectStore>,
}

impl CosClient {
    /// Create a client for the endpoint named by `config`
    pub fn new(config: &CosConfig) -> Result<Self> {
        Self::connect(config, None)
    }

    /// Create a client for an explicit endpoint, ignoring the configured one
    pub fn with_endpoint(config: &CosConfig, endpoint: &str) -> Result<Self> {
        Self::connect(config, Some(endpoint))
    }

    /// Wrap an existing store
    pub fn from_store(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    fn connect(config: &CosConfig, endpoint: Option<&str>) -> Result<Self> {
        config.hmac_keys.validate()?;
        let endpoint = config.resolve_endpoint(endpoint)?;

        let store = SdkStore::new(&config.hmac_keys, &endpoint, config.region());
        info!(endpoint = %endpoint, "Object storage client initialized");

        Ok(Self {
            store: Arc::new(store),
        })
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Look up the endpoint URL for `location` in the provider's endpoint
    /// directory (`config.endpoints`).
    ///
    /// Returns `Ok(None)` without touching the network when `url_type` is
    /// not one of `public`, `private` or `direct`.
    pub async fn url_from_location(
        config: &CosConfig,
        location: &str,
        url_type: &str,
    ) -> Result<Option<String>> {
        Self::url_from_location_with(&HttpDirectory::new(), config, location, url_type).await
    }

    /// Public endpoint URL for `location`
    pub async fn url_from_location_default(
        config: &CosConfig,
        location: &str,
    ) -> Result<Option<String>> {
        Self::url_from_location(config, location, DEFAULT_URL_TYPE.as_str()).await
    }

    /// [`url_from_location`](Self::url_from_location) with a caller-supplied
    /// directory source
    pub async fn url_from_location_with(
        directory: &dyn EndpointDirectory,
        config: &CosConfig,
        location: &str,
        url_type: &str,
    ) -> Result<Option<String>> {
        let Some(url_type) = UrlType::parse(url_type) else {
            debug!(url_type = %url_type, "Unrecognized url type, skipping lookup");
            return Ok(None);
        };

        let directory_url = config
            .endpoints
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                CosError::Configuration("endpoints (discovery URL) is not configured".to_string())
            })?;

        let doc = directory.get_json(directory_url).await?;
        let url = endpoint_from_document(&doc, location, url_type)?;

        debug!(location = %location, url_type = url_type.as_str(), url = %url, "Resolved endpoint");
        Ok(Some(url))
    }
}
