//! `ObjectStore` backed by the AWS S3 SDK

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::{ByteStream, Length};
use aws_sdk_s3::types::{
    BucketCannedAcl, CompletedMultipartUpload, CompletedPart, ObjectCannedAcl, StorageClass,
};
use aws_sdk_s3::Client;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::HmacKeys;
use crate::cos::post_policy::PostPolicy;
use crate::cos::store::ObjectStore;
use crate::cos::transfer::UploadOptions;
use crate::cos::types::{Acl, Bucket, ListObjectsResult, ObjectEntry, PresignedPost};
use crate::error::{CosError, Result};

/// Applies `ExtraArgs` to any request builder that has the usual object
/// header setters (`PutObject`, `CreateMultipartUpload`).
macro_rules! apply_extra_args {
    ($request:expr, $args:expr) => {{
        let args = $args;
        let mut request = $request;
        if let Some(v) = &args.content_type {
            request = request.content_type(v);
        }
        if let Some(v) = &args.cache_control {
            request = request.cache_control(v);
        }
        if let Some(v) = &args.content_disposition {
            request = request.content_disposition(v);
        }
        if let Some(v) = &args.content_encoding {
            request = request.content_encoding(v);
        }
        if let Some(v) = &args.acl {
            request = request.acl(ObjectCannedAcl::from(v.as_str()));
        }
        if let Some(v) = &args.storage_class {
            request = request.storage_class(StorageClass::from(v.as_str()));
        }
        if !args.metadata.is_empty() {
            request = request.set_metadata(Some(args.metadata.clone()));
        }
        request
    }};
}

/// S3 SDK client plus what's needed to sign POST policies locally
pub struct SdkStore {
    client: Client,
    keys: HmacKeys,
    endpoint: String,
    region: String,
}

impl SdkStore {
    /// Build a path-style client for `endpoint`. Makes no network call.
    pub fn new(keys: &HmacKeys, endpoint: &str, region: &str) -> Self {
        let credentials = Credentials::new(
            &keys.access_key_id,
            &keys.secret_access_key,
            None,
            None,
            "cos-client",
        );

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        debug!(endpoint = %endpoint, region = %region, "Object store client configured");

        Self {
            client: Client::from_conf(config),
            keys: keys.clone(),
            endpoint: endpoint.to_string(),
            region: region.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    async fn upload_multipart(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        size: u64,
        options: &UploadOptions,
    ) -> Result<()> {
        let create = apply_extra_args!(
            self.client.create_multipart_upload().bucket(bucket).key(key),
            &options.extra_args
        )
        .send()
        .await
        .map_err(|e| CosError::from_sdk("create_multipart_upload", e).into_transfer("upload"))?;

        let upload_id = create
            .upload_id()
            .ok_or_else(|| CosError::transfer("upload", "service returned no upload id"))?
            .to_string();

        let part_count = options.transfer.part_count(size);
        debug!(
            bucket = %bucket,
            key = %key,
            parts = part_count,
            part_size = options.transfer.effective_part_size(size),
            "Starting multipart upload"
        );

        let parts = futures::stream::iter(options.transfer.parts(size))
            .map(|part| {
                let upload_id = upload_id.as_str();
                async move {
                    let body = ByteStream::read_from()
                        .path(local_path)
                        .offset(part.offset)
                        .length(Length::Exact(part.length))
                        .build()
                        .await
                        .map_err(|e| CosError::transfer("upload", e.to_string()))?;

                    let response = self
                        .client
                        .upload_part()
                        .bucket(bucket)
                        .key(key)
                        .upload_id(upload_id)
                        .part_number(part.number)
                        .body(body)
                        .send()
                        .await
                        .map_err(|e| CosError::from_sdk("upload_part", e))?;

                    options.report(part.length);

                    Ok::<_, CosError>(
                        CompletedPart::builder()
                            .part_number(part.number)
                            .set_e_tag(response.e_tag().map(str::to_string))
                            .build(),
                    )
                }
            })
            .buffer_unordered(options.transfer.max_concurrency)
            .try_collect::<Vec<_>>()
            .await;

        let mut parts = match parts {
            Ok(parts) => parts,
            Err(e) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!(
                        bucket = %bucket,
                        key = %key,
                        error = %DisplayErrorContext(&abort_err),
                        "Failed to abort multipart upload"
                    );
                    return Err(e.into_transfer("upload").with_cleanup_failure(
                        DisplayErrorContext(&abort_err),
                    ));
                }
                return Err(e.into_transfer("upload"));
            }
        };

        parts.sort_by_key(|p| p.part_number());

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(&upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| CosError::from_sdk("complete_multipart_upload", e).into_transfer("upload"))?;

        Ok(())
    }
}

fn to_chrono(d: &aws_sdk_s3::primitives::DateTime) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp(d.secs(), d.subsec_nanos()).unwrap_or_default()
}

#[async_trait]
impl ObjectStore for SdkStore {
    async fn create_bucket(&self, bucket: &str, acl: Acl) -> Result<()> {
        self.client
            .create_bucket()
            .bucket(bucket)
            .acl(BucketCannedAcl::from(acl.as_str()))
            .send()
            .await
            .map_err(|e| CosError::from_sdk("create_bucket", e))?;

        Ok(())
    }

    async fn list_buckets(&self) -> Result<Option<Vec<Bucket>>> {
        let response = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| CosError::from_sdk("list_buckets", e))?;

        let buckets = response.buckets.map(|buckets| {
            buckets
                .iter()
                .map(|b| Bucket {
                    name: b.name().unwrap_or_default().to_string(),
                    creation_date: b.creation_date().map(to_chrono),
                    region: b.bucket_region().map(|r| r.to_string()),
                })
                .collect()
        });

        Ok(buckets)
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        max_keys: i32,
        continuation_token: Option<&str>,
    ) -> Result<ListObjectsResult> {
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .max_keys(max_keys);

        if let Some(token) = continuation_token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CosError::from_sdk("list_objects_v2", e))?;

        let objects = response
            .contents()
            .iter()
            .map(|obj| ObjectEntry {
                key: obj.key().unwrap_or_default().to_string(),
                size: obj.size().unwrap_or(0) as u64,
                last_modified: obj.last_modified().map(to_chrono),
                etag: obj.e_tag().map(|s| s.to_string()),
                storage_class: obj.storage_class().map(|s| s.as_str().to_string()),
            })
            .collect();

        Ok(ListObjectsResult {
            objects,
            is_truncated: response.is_truncated().unwrap_or(false),
            next_token: response.next_continuation_token().map(|s| s.to_string()),
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| CosError::from_sdk("delete_object", e))?;

        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| CosError::from_sdk("delete_bucket", e))?;

        Ok(())
    }

    async fn download_to_path(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| CosError::from_sdk("get_object", e).into_transfer("download"))?;

        let mut file = tokio::fs::File::create(local_path)
            .await
            .map_err(|e| CosError::transfer("download", format!("{:?}: {}", local_path, e)))?;

        let mut body = response.body;
        let mut written = 0u64;
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| CosError::transfer("download", DisplayErrorContext(&e).to_string()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| CosError::transfer("download", format!("{:?}: {}", local_path, e)))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| CosError::transfer("download", format!("{:?}: {}", local_path, e)))?;

        debug!(bucket = %bucket, key = %key, bytes = written, "Object downloaded");
        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| CosError::from_sdk("put_object", e))?;

        Ok(())
    }

    async fn upload_file(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        options: &UploadOptions,
    ) -> Result<()> {
        options.transfer.validate()?;

        let size = tokio::fs::metadata(local_path)
            .await
            .map_err(|e| CosError::transfer("upload", format!("{:?}: {}", local_path, e)))?
            .len();

        if size > options.transfer.multipart_threshold {
            self.upload_multipart(local_path, bucket, key, size, options)
                .await?;
        } else {
            let body = ByteStream::from_path(local_path)
                .await
                .map_err(|e| CosError::transfer("upload", e.to_string()))?;

            apply_extra_args!(
                self.client.put_object().bucket(bucket).key(key).body(body),
                &options.extra_args
            )
            .send()
            .await
            .map_err(|e| CosError::from_sdk("put_object", e).into_transfer("upload"))?;

            options.report(size);
        }

        info!(bucket = %bucket, key = %key, bytes = size, "Upload complete");
        Ok(())
    }

    async fn presign_post(&self, bucket: &str, key: &str, expires_in: u64) -> Result<PresignedPost> {
        PostPolicy {
            access_key_id: &self.keys.access_key_id,
            secret_access_key: &self.keys.secret_access_key,
            region: &self.region,
            endpoint: &self.endpoint,
            bucket,
            key,
            expires_in,
        }
        .sign(chrono::Utc::now())
    }

    async fn presign_get(&self, bucket: &str, key: &str, expires_in: u64) -> Result<String> {
        let presigning_config = PresigningConfig::expires_in(Duration::from_secs(expires_in))
            .map_err(|e| CosError::Signing(format!("invalid presign duration: {}", e)))?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| CosError::Signing(DisplayErrorContext(&e).to_string()))?;

        Ok(presigned.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SdkStore {
        SdkStore::new(
            &HmacKeys::new("AKIDEXAMPLE", "SECRETEXAMPLE"),
            "https://s3.example.test",
            "us-east-1",
        )
    }

    #[tokio::test]
    async fn test_presign_get_is_local_and_embeds_expiry() {
        let url = store().presign_get("reports", "2024/q1.csv", 300).await.unwrap();

        assert!(url.starts_with("https://s3.example.test/reports/2024/q1.csv?"));
        assert!(url.contains("X-Amz-Expires=300"));
        assert!(url.contains("X-Amz-Signature="));
        assert!(url.contains("AKIDEXAMPLE"));
    }

    #[tokio::test]
    async fn test_presign_get_rejects_long_expiry() {
        let err = store()
            .presign_get("reports", "a", 8 * 24 * 60 * 60)
            .await
            .unwrap_err();
        assert!(matches!(err, CosError::Signing(_)));
    }

    #[tokio::test]
    async fn test_presign_post_uses_store_endpoint() {
        let post = store().presign_post("uploads", "in/file.bin", 600).await.unwrap();
        assert_eq!(post.url, "https://s3.example.test/uploads");
        assert_eq!(post.expires_in, 600);
        assert!(post.fields["x-amz-credential"].starts_with("AKIDEXAMPLE/"));
    }

    #[test]
    fn test_accessors() {
        let s = store();
        assert_eq!(s.endpoint(), "https://s3.example.test");
        assert_eq!(s.region(), "us-east-1");
    }
}
