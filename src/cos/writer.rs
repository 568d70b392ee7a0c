//! Object uploads into a single bucket

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::config::CosConfig;
use crate::cos::client::CosClient;
use crate::cos::store::ObjectStore;
use crate::cos::transfer::{ExtraArgs, ProgressCallback, TransferConfig, UploadOptions};
use crate::error::Result;

pub struct CosWriter {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl CosWriter {
    pub fn new(config: &CosConfig, bucket: &str) -> Result<Self> {
        Ok(Self::from_client(&CosClient::new(config)?, bucket))
    }

    pub fn from_client(client: &CosClient, bucket: &str) -> Self {
        Self {
            store: client.store().clone(),
            bucket: bucket.to_string(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Store `data` under `key` in one request
    pub async fn store(&self, key: &str, data: impl Into<Bytes>) -> Result<()> {
        let data = data.into();
        debug!(bucket = %self.bucket, key = %key, bytes = data.len(), "Storing object");
        self.store.put_object(&self.bucket, key, data).await
    }

    /// Upload a local file, switching to multipart above the transfer
    /// config's threshold. `callback` receives byte-count increments.
    pub async fn upload(
        &self,
        key: &str,
        filename: impl AsRef<Path>,
        extra_args: Option<ExtraArgs>,
        callback: Option<ProgressCallback>,
        config: Option<TransferConfig>,
    ) -> Result<()> {
        let options = UploadOptions {
            extra_args: extra_args.unwrap_or_default(),
            progress: callback,
            transfer: config.unwrap_or_default(),
        };

        let filename = filename.as_ref();
        debug!(bucket = %self.bucket, key = %key, file = ?filename, "Uploading file");
        self.store
            .upload_file(filename, &self.bucket, key, &options)
            .await
    }
}
