//! Endpoint discovery
//!
//! The provider publishes a JSON document mapping locations to endpoint
//! hostnames:
//!
//! ```json
//! { "service-endpoints": { "regional": {
//!     "us-south": { "public": { "us-south": "s3.us-south.example.cloud" } }
//! } } }
//! ```

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::cos::types::UrlType;
use crate::error::{CosError, Result};

/// Source of the endpoint discovery document
#[async_trait]
pub trait EndpointDirectory: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value>;
}

/// Fetches the discovery document over HTTPS
#[derive(Debug, Clone, Default)]
pub struct HttpDirectory {
    client: reqwest::Client,
}

impl HttpDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EndpointDirectory for HttpDirectory {
    async fn get_json(&self, url: &str) -> Result<Value> {
        debug!(url = %url, "Fetching endpoint directory");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CosError::Resolution(format!("GET {} failed: {}", url, e)))?
            .error_for_status()
            .map_err(|e| CosError::Resolution(format!("GET {} failed: {}", url, e)))?;

        response
            .json::<Value>()
            .await
            .map_err(|e| CosError::Resolution(format!("{} did not return JSON: {}", url, e)))
    }
}

/// Pull `service-endpoints.regional[location][url_type][location]` out of
/// the discovery document and turn it into an https URL.
pub fn endpoint_from_document(doc: &Value, location: &str, url_type: UrlType) -> Result<String> {
    let host = doc
        .get("service-endpoints")
        .and_then(|v| v.get("regional"))
        .and_then(|v| v.get(location))
        .and_then(|v| v.get(url_type.as_str()))
        .and_then(|v| v.get(location))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            CosError::Resolution(format!(
                "no {} endpoint for location '{}' in endpoint directory",
                url_type.as_str(),
                location
            ))
        })?;

    Ok(format!("https://{}", host))
}
