//! Upload tuning and per-upload options

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{CosError, Result};

const MIB: u64 = 1024 * 1024;

/// Smallest part size S3 accepts for every part but the last
pub const MIN_PART_SIZE: u64 = 5 * MIB;

/// Most parts a single multipart upload may have
pub const MAX_PARTS: u64 = 10_000;

/// Called with the number of bytes transferred since the previous call.
///
/// Runs on the upload task, so it must return quickly.
pub type ProgressCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Multipart transfer tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    /// Files larger than this use multipart upload
    pub multipart_threshold: u64,
    pub part_size: u64,
    /// Parts uploaded at the same time
    pub max_concurrency: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            multipart_threshold: 8 * MIB,
            part_size: 8 * MIB,
            max_concurrency: 10,
        }
    }
}

impl TransferConfig {
    pub fn validate(&self) -> Result<()> {
        if self.part_size < MIN_PART_SIZE {
            return Err(CosError::Configuration(format!(
                "part_size {} is below the minimum of {} bytes",
                self.part_size, MIN_PART_SIZE
            )));
        }
        if self.max_concurrency == 0 {
            return Err(CosError::Configuration(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Part size actually used for a file of `size` bytes. Grows past
    /// `part_size` when needed to stay within [`MAX_PARTS`].
    pub fn effective_part_size(&self, size: u64) -> u64 {
        self.part_size.max(size.div_ceil(MAX_PARTS))
    }

    /// Number of parts a file of `size` bytes is split into
    pub fn part_count(&self, size: u64) -> u64 {
        if size == 0 {
            1
        } else {
            size.div_ceil(self.effective_part_size(size))
        }
    }

    /// Byte ranges of the parts of a file of `size` bytes, in part order
    pub fn parts(&self, size: u64) -> impl Iterator<Item = PartRange> {
        let part_size = self.effective_part_size(size);
        (0..self.part_count(size)).map(move |index| {
            let offset = index * part_size;
            PartRange {
                number: (index + 1) as i32,
                offset,
                length: part_size.min(size - offset),
            }
        })
    }
}

/// One part of a multipart upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartRange {
    /// 1-based, as the service numbers parts
    pub number: i32,
    pub offset: u64,
    pub length: u64,
}

/// Extra request parameters applied to uploads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraArgs {
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    /// Canned object ACL, e.g. `public-read`
    pub acl: Option<String>,
    pub storage_class: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl ExtraArgs {
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Everything `ObjectStore::upload_file` accepts beyond the target
#[derive(Clone, Default)]
pub struct UploadOptions {
    pub extra_args: ExtraArgs,
    pub progress: Option<ProgressCallback>,
    pub transfer: TransferConfig,
}

impl UploadOptions {
    pub(crate) fn report(&self, bytes: u64) {
        if let Some(cb) = &self.progress {
            cb(bytes);
        }
    }
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("extra_args", &self.extra_args)
            .field("progress", &self.progress.is_some())
            .field("transfer", &self.transfer)
            .finish()
    }
}
