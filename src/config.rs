//! Connection configuration
//!
//! The configuration mirrors the service-credential document handed out by the
//! storage provider:
//!
//! ```json
//! {
//!   "cos_hmac_keys": { "access_key_id": "...", "secret_access_key": "..." },
//!   "endpoint": "https://s3.eu-de.cloud-object-storage.appdomain.cloud",
//!   "endpoints": "https://control.cloud-object-storage.cloud.ibm.com/v2/endpoints"
//! }
//! ```
//!
//! It can be loaded from JSON or YAML files, or built in code.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CosError, Result};

/// Region used for request signing when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// HMAC credential pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HmacKeys {
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
}

impl HmacKeys {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    /// Both halves must be present and non-blank
    pub fn validate(&self) -> Result<()> {
        if self.access_key_id.trim().is_empty() {
            return Err(CosError::Configuration(
                "cos_hmac_keys.access_key_id is missing".to_string(),
            ));
        }
        if self.secret_access_key.trim().is_empty() {
            return Err(CosError::Configuration(
                "cos_hmac_keys.secret_access_key is missing".to_string(),
            ));
        }
        Ok(())
    }
}

/// Storage connection configuration, immutable once a client is built
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CosConfig {
    #[serde(rename = "cos_hmac_keys", default)]
    pub hmac_keys: HmacKeys,

    /// Service endpoint URL
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Endpoint discovery document URL, used by `CosClient::url_from_location`
    #[serde(default)]
    pub endpoints: Option<String>,

    /// Location code used to pick from `regional_endpoints`
    #[serde(default)]
    pub location: Option<String>,

    /// Signing region
    #[serde(default)]
    pub region: Option<String>,

    /// Location code -> endpoint URL
    #[serde(default)]
    pub regional_endpoints: HashMap<String, String>,
}

impl CosConfig {
    /// Configuration with credentials and a fixed endpoint
    pub fn new(hmac_keys: HmacKeys, endpoint: impl Into<String>) -> Self {
        Self {
            hmac_keys,
            endpoint: Some(endpoint.into()),
            ..Default::default()
        }
    }

    /// Load configuration from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            CosError::Configuration(format!("failed to read config from {:?}: {}", path, e))
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let config = match ext.as_deref() {
            Some("yaml" | "yml") => Self::from_yaml_str(&contents),
            Some("json") | None => Self::from_json_str(&contents),
            Some(other) => Err(CosError::Configuration(format!(
                "unsupported config format '.{}' for {:?}",
                other, path
            ))),
        }?;

        tracing::debug!(path = ?path, "Loaded storage configuration");

        Ok(config)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| CosError::Configuration(format!("failed to parse JSON config: {}", e)))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| CosError::Configuration(format!("failed to parse YAML config: {}", e)))
    }

    /// Signing region, falling back to [`DEFAULT_REGION`]
    pub fn region(&self) -> &str {
        self.region
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REGION)
    }

    /// Pick the endpoint to connect to.
    ///
    /// An explicit override wins, then `endpoint`, then the
    /// `regional_endpoints` entry for `location`.
    pub fn resolve_endpoint(&self, override_endpoint: Option<&str>) -> Result<String> {
        let candidate = override_endpoint
            .map(str::to_string)
            .or_else(|| self.endpoint.clone())
            .or_else(|| {
                self.location
                    .as_ref()
                    .and_then(|loc| self.regional_endpoints.get(loc))
                    .cloned()
            })
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                CosError::Configuration(
                    "no endpoint configured (set endpoint, or location with regional_endpoints)"
                        .to_string(),
                )
            })?;

        validate_endpoint(&candidate)?;
        Ok(candidate)
    }
}

/// Endpoints must be absolute http(s) URLs with a host
pub(crate) fn validate_endpoint(endpoint: &str) -> Result<()> {
    let parsed = url::Url::parse(endpoint)
        .map_err(|e| CosError::Configuration(format!("invalid endpoint {:?}: {}", endpoint, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(CosError::Configuration(format!(
            "endpoint {:?} must be an http(s) URL",
            endpoint
        )));
    }

    Ok(())
}
