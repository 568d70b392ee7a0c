//! Object storage capability
//!
//! Every role in this crate talks to the storage service through
//! [`ObjectStore`]. [`SdkStore`](crate::cos::SdkStore) is the production
//! implementation; tests plug in an in-memory one.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;

use crate::cos::transfer::UploadOptions;
use crate::cos::types::{Acl, Bucket, ListObjectsResult, PresignedPost};
use crate::error::Result;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn create_bucket(&self, bucket: &str, acl: Acl) -> Result<()>;

    /// `None` when the service response carries no bucket list at all
    async fn list_buckets(&self) -> Result<Option<Vec<Bucket>>>;

    /// Fetch one listing page of at most `max_keys` entries
    async fn list_objects_page(
        &self,
        bucket: &str,
        max_keys: i32,
        continuation_token: Option<&str>,
    ) -> Result<ListObjectsResult>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    async fn delete_bucket(&self, bucket: &str) -> Result<()>;

    /// Download an object into `local_path`, creating or truncating it
    async fn download_to_path(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()>;

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()>;

    async fn upload_file(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        options: &UploadOptions,
    ) -> Result<()>;

    async fn presign_post(&self, bucket: &str, key: &str, expires_in: u64) -> Result<PresignedPost>;

    async fn presign_get(&self, bucket: &str, key: &str, expires_in: u64) -> Result<String>;
}
