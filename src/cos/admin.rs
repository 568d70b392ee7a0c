//! Bucket administration and content enumeration

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::CosConfig;
use crate::cos::client::CosClient;
use crate::cos::store::ObjectStore;
use crate::cos::types::{Acl, Bucket, ObjectEntry};
use crate::error::{CosError, Result, StorageErrorKind};

/// Page size used by [`CosAdmin::bucket_contents_default`]
pub const DEFAULT_MAX_KEYS: i32 = 100;

pub struct CosAdmin {
    store: Arc<dyn ObjectStore>,
}

impl CosAdmin {
    pub fn new(config: &CosConfig) -> Result<Self> {
        Ok(Self::from_client(&CosClient::new(config)?))
    }

    pub fn from_client(client: &CosClient) -> Self {
        Self {
            store: client.store().clone(),
        }
    }

    pub async fn bucket_create(&self, name: &str, acl: Acl) -> Result<()> {
        debug!(bucket = %name, acl = acl.as_str(), "Creating bucket");
        self.store.create_bucket(name, acl).await?;
        info!(bucket = %name, "Bucket created");
        Ok(())
    }

    /// List all buckets, in service order.
    ///
    /// A response without a bucket list reads as "no buckets".
    pub async fn bucket_list(&self) -> Result<Vec<Bucket>> {
        match self.store.list_buckets().await? {
            Some(buckets) => Ok(buckets),
            None => {
                debug!("Bucket listing carried no buckets field, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Every entry of a bucket, fetched `max_keys` at a time and returned in
    /// the order the service delivered them.
    pub async fn bucket_contents(&self, name: &str, max_keys: i32) -> Result<Vec<ObjectEntry>> {
        if max_keys <= 0 {
            return Err(CosError::Configuration(format!(
                "max_keys must be positive, got {}",
                max_keys
            )));
        }

        let mut files = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .store
                .list_objects_page(name, max_keys, next_token.as_deref())
                .await?;
            pages += 1;
            files.extend(page.objects);

            if !page.is_truncated {
                break;
            }

            next_token = match page.next_token {
                Some(token) if !token.is_empty() => Some(token),
                _ => {
                    return Err(CosError::storage(
                        "list_objects_v2",
                        StorageErrorKind::Other,
                        "listing is truncated but carries no continuation token",
                    ))
                }
            };
        }

        debug!(bucket = %name, entries = files.len(), pages, "Listed bucket contents");
        Ok(files)
    }

    pub async fn bucket_contents_default(&self, name: &str) -> Result<Vec<ObjectEntry>> {
        self.bucket_contents(name, DEFAULT_MAX_KEYS).await
    }

    pub async fn bucket_content_delete(&self, name: &str, key: &str) -> Result<()> {
        debug!(bucket = %name, key = %key, "Deleting object");
        self.store.delete_object(name, key).await
    }

    pub async fn bucket_delete(&self, name: &str) -> Result<()> {
        self.store.delete_bucket(name).await?;
        info!(bucket = %name, "Bucket deleted");
        Ok(())
    }
}
