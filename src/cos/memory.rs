//! In-memory `ObjectStore` for unit tests

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::cos::store::ObjectStore;
use crate::cos::transfer::{ExtraArgs, UploadOptions};
use crate::cos::types::{Acl, Bucket, ListObjectsResult, ObjectEntry, PresignedPost};
use crate::error::{CosError, Result, StorageErrorKind};

#[derive(Default)]
pub(crate) struct MemoryStore {
    buckets: Mutex<BTreeMap<String, BTreeMap<String, Bytes>>>,
    last_extra_args: Mutex<Option<ExtraArgs>>,
    page_calls: AtomicUsize,
    /// Downloads write half the object and then fail
    pub fail_partial_download: AtomicBool,
    /// `list_buckets` answers without a bucket field
    pub omit_bucket_field: AtomicBool,
    /// Listing pages claim truncation but carry no token
    pub truncate_without_token: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects(bucket: &str, objects: &[(&str, &str)]) -> Self {
        let store = Self::new();
        {
            let mut buckets = store.buckets.lock().unwrap();
            let contents = buckets.entry(bucket.to_string()).or_default();
            for (key, data) in objects {
                contents.insert(key.to_string(), Bytes::copy_from_slice(data.as_bytes()));
            }
        }
        store
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|b| b.get(key))
            .cloned()
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.lock().unwrap().contains_key(bucket)
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn last_extra_args(&self) -> Option<ExtraArgs> {
        self.last_extra_args.lock().unwrap().clone()
    }

    fn insert(&self, bucket: &str, key: &str, data: Bytes) -> Result<()> {
        let mut buckets = self.buckets.lock().unwrap();
        let contents = buckets.get_mut(bucket).ok_or_else(|| no_such_bucket("put_object"))?;
        contents.insert(key.to_string(), data);
        Ok(())
    }
}

fn no_such_bucket(op: &'static str) -> CosError {
    CosError::storage(op, StorageErrorKind::NotFound, "NoSuchBucket")
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn create_bucket(&self, bucket: &str, _acl: Acl) -> Result<()> {
        let mut buckets = self.buckets.lock().unwrap();
        if buckets.contains_key(bucket) {
            return Err(CosError::storage(
                "create_bucket",
                StorageErrorKind::AlreadyExists,
                "BucketAlreadyOwnedByYou",
            ));
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Option<Vec<Bucket>>> {
        if self.omit_bucket_field.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let buckets = self.buckets.lock().unwrap();
        Ok(Some(
            buckets
                .keys()
                .map(|name| Bucket {
                    name: name.clone(),
                    creation_date: None,
                    region: None,
                })
                .collect(),
        ))
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        max_keys: i32,
        continuation_token: Option<&str>,
    ) -> Result<ListObjectsResult> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);

        let buckets = self.buckets.lock().unwrap();
        let contents = buckets.get(bucket).ok_or_else(|| no_such_bucket("list_objects_v2"))?;

        let remaining: Vec<(&String, &Bytes)> = contents
            .iter()
            .filter(|(key, _)| continuation_token.map_or(true, |t| key.as_str() > t))
            .collect();

        let take = max_keys.max(0) as usize;
        let objects: Vec<ObjectEntry> = remaining
            .iter()
            .take(take)
            .map(|(key, data)| ObjectEntry::new(key.as_str(), data.len() as u64))
            .collect();

        let is_truncated = remaining.len() > take;
        let next_token = if is_truncated && !self.truncate_without_token.load(Ordering::SeqCst) {
            objects.last().map(|o| o.key.clone())
        } else {
            None
        };

        Ok(ListObjectsResult {
            objects,
            is_truncated,
            next_token,
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let mut buckets = self.buckets.lock().unwrap();
        let contents = buckets.get_mut(bucket).ok_or_else(|| no_such_bucket("delete_object"))?;
        contents.remove(key);
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let mut buckets = self.buckets.lock().unwrap();
        match buckets.get(bucket) {
            None => Err(no_such_bucket("delete_bucket")),
            Some(contents) if !contents.is_empty() => Err(CosError::storage(
                "delete_bucket",
                StorageErrorKind::Conflict,
                "BucketNotEmpty",
            )),
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
        }
    }

    async fn download_to_path(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()> {
        let data = self.object(bucket, key).ok_or_else(|| {
            CosError::storage("get_object", StorageErrorKind::NotFound, "NoSuchKey")
                .into_transfer("download")
        })?;

        if self.fail_partial_download.load(Ordering::SeqCst) {
            tokio::fs::write(local_path, &data[..data.len() / 2])
                .await
                .map_err(|e| CosError::transfer("download", e.to_string()))?;
            return Err(CosError::transfer("download", "connection reset by peer"));
        }

        tokio::fs::write(local_path, &data)
            .await
            .map_err(|e| CosError::transfer("download", e.to_string()))
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        self.insert(bucket, key, body)
    }

    async fn upload_file(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        options: &UploadOptions,
    ) -> Result<()> {
        options.transfer.validate()?;
        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| CosError::transfer("upload", e.to_string()))?;

        self.insert(bucket, key, Bytes::from(data.clone()))
            .map_err(|e| e.into_transfer("upload"))?;
        *self.last_extra_args.lock().unwrap() = Some(options.extra_args.clone());

        for part in options.transfer.parts(data.len() as u64) {
            options.report(part.length);
        }
        Ok(())
    }

    async fn presign_post(&self, bucket: &str, key: &str, expires_in: u64) -> Result<PresignedPost> {
        let mut fields = BTreeMap::new();
        fields.insert("key".to_string(), key.to_string());
        Ok(PresignedPost {
            url: format!("memory://{}", bucket),
            fields,
            expires_in,
        })
    }

    async fn presign_get(&self, bucket: &str, key: &str, expires_in: u64) -> Result<String> {
        Ok(format!("memory://{}/{}?X-Amz-Expires={}", bucket, key, expires_in))
    }
}
