//! Object storage data types

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CosError;

/// Represents a bucket as returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    pub creation_date: Option<DateTime<Utc>>,
    pub region: Option<String>,
}

/// Represents one entry of a bucket listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
    pub storage_class: Option<String>,
}

impl ObjectEntry {
    /// Entry with only key and size set
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified: None,
            etag: None,
            storage_class: None,
        }
    }
}

/// One page of a bucket listing
#[derive(Debug, Clone, Default)]
pub struct ListObjectsResult {
    pub objects: Vec<ObjectEntry>,
    pub is_truncated: bool,
    /// Token for the next page; only meaningful while `is_truncated`
    pub next_token: Option<String>,
}

/// Canned bucket ACL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acl {
    #[default]
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
}

impl Acl {
    pub fn as_str(&self) -> &'static str {
        match self {
            Acl::Private => "private",
            Acl::PublicRead => "public-read",
            Acl::PublicReadWrite => "public-read-write",
            Acl::AuthenticatedRead => "authenticated-read",
        }
    }
}

impl FromStr for Acl {
    type Err = CosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "private" => Ok(Acl::Private),
            "public-read" => Ok(Acl::PublicRead),
            "public-read-write" => Ok(Acl::PublicReadWrite),
            "authenticated-read" => Ok(Acl::AuthenticatedRead),
            other => Err(CosError::Configuration(format!("unknown ACL '{}'", other))),
        }
    }
}

/// Endpoint flavour published by the endpoint discovery document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlType {
    Public,
    Private,
    Direct,
}

impl UrlType {
    /// Case-insensitive parse; `None` for anything unrecognised
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Some(UrlType::Public),
            "private" => Some(UrlType::Private),
            "direct" => Some(UrlType::Direct),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UrlType::Public => "public",
            UrlType::Private => "private",
            UrlType::Direct => "direct",
        }
    }
}

/// Browser-form upload target produced by a presigned POST
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresignedPost {
    pub url: String,
    /// Form fields that must accompany the file field
    pub fields: BTreeMap<String, String>,
    pub expires_in: u64,
}
