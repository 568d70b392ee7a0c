//! Cloud Object Storage client library
//!
//! A thin layer over S3-compatible object storage: bucket administration,
//! object reads through scoped local copies, uploads, and presigned URLs.
//! Each role is built from a [`CosConfig`] and delegates to an
//! [`ObjectStore`], backed by the AWS S3 SDK in production.

pub mod config;
pub mod cos;
pub mod error;
pub mod logging;

pub use config::{CosConfig, HmacKeys};
pub use cos::{
    Acl, Bucket, CosAdmin, CosClient, CosPresignedUrl, CosReader, CosWriter, ExtraArgs,
    ObjectEntry, ObjectStore, PresignedPost, ProgressCallback, TransferConfig,
};
pub use error::{CosError, Result, StorageErrorKind};
