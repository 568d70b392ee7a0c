//! Presigned URL issuing

use std::sync::Arc;

use tracing::debug;

use crate::config::{validate_endpoint, HmacKeys, DEFAULT_REGION};
use crate::cos::sdk::SdkStore;
use crate::cos::store::ObjectStore;
use crate::cos::types::PresignedPost;
use crate::error::{CosError, Result};

/// Validity used when the caller doesn't pick one
pub const DEFAULT_EXPIRES_IN: u64 = 300;

/// Issues time-limited GET and POST URLs.
///
/// Built from a bare HMAC key pair rather than a [`CosConfig`](crate::CosConfig)
/// so it can run where only signing credentials are available.
pub struct CosPresignedUrl {
    store: Arc<dyn ObjectStore>,
}

impl CosPresignedUrl {
    pub fn new(hmac_key: &str, hmac_secret: &str, endpoint: &str) -> Result<Self> {
        Self::with_region(hmac_key, hmac_secret, endpoint, DEFAULT_REGION)
    }

    pub fn with_region(
        hmac_key: &str,
        hmac_secret: &str,
        endpoint: &str,
        region: &str,
    ) -> Result<Self> {
        if hmac_key.trim().is_empty() || hmac_secret.trim().is_empty() {
            return Err(CosError::Signing(
                "HMAC key and secret must not be empty".to_string(),
            ));
        }
        validate_endpoint(endpoint)?;

        let keys = HmacKeys::new(hmac_key, hmac_secret);
        Ok(Self {
            store: Arc::new(SdkStore::new(&keys, endpoint, region)),
        })
    }

    pub fn from_store(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// URL and form fields for a browser POST upload of `key`
    pub async fn create_post(&self, bucket: &str, key: &str, expires_in: u64) -> Result<PresignedPost> {
        debug!(bucket = %bucket, key = %key, expires_in, "Presigning POST");
        self.store.presign_post(bucket, key, expires_in).await
    }

    pub async fn create_post_default(&self, bucket: &str, key: &str) -> Result<PresignedPost> {
        self.create_post(bucket, key, DEFAULT_EXPIRES_IN).await
    }

    /// Signed GET URL for `key`
    pub async fn create_get(&self, bucket: &str, key: &str, expires_in: u64) -> Result<String> {
        debug!(bucket = %bucket, key = %key, expires_in, "Presigning GET");
        self.store.presign_get(bucket, key, expires_in).await
    }

    pub async fn create_get_default(&self, bucket: &str, key: &str) -> Result<String> {
        self.create_get(bucket, key, DEFAULT_EXPIRES_IN).await
    }
}
