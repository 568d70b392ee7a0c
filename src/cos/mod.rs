//! Object storage roles
//!
//! - [`client::CosClient`] - configured handle shared by every role
//! - [`admin::CosAdmin`] - bucket lifecycle and content listing
//! - [`reader::CosReader`] - scoped local copies of remote objects
//! - [`writer::CosWriter`] - direct stores and file uploads
//! - [`presign::CosPresignedUrl`] - presigned GET/POST URLs
//! - [`store::ObjectStore`] - the storage capability they all delegate to

pub mod admin;
pub mod client;
pub mod post_policy;
pub mod presign;
pub mod reader;
pub mod resolve;
pub mod sdk;
pub mod store;
pub mod transfer;
pub mod types;
pub mod writer;

#[cfg(test)]
pub(crate) mod memory;

// Re-export commonly used types
pub use admin::{CosAdmin, DEFAULT_MAX_KEYS};
pub use client::{CosClient, DEFAULT_URL_TYPE};
pub use presign::{CosPresignedUrl, DEFAULT_EXPIRES_IN};
pub use reader::{CosReader, ReaderState};
pub use resolve::{EndpointDirectory, HttpDirectory};
pub use sdk::SdkStore;
pub use store::ObjectStore;
pub use transfer::{
    ExtraArgs, PartRange, ProgressCallback, TransferConfig, UploadOptions, MAX_PARTS,
};
pub use types::{Acl, Bucket, ListObjectsResult, ObjectEntry, PresignedPost, UrlType};
pub use writer::CosWriter;
