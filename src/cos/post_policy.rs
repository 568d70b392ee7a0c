//! SigV4 POST policy signing
//!
//! The SDK presigns request URLs but not browser-form POST uploads, so the
//! policy document is built and signed here.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::cos::types::PresignedPost;
use crate::error::{CosError, Result};

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Longest validity SigV4 allows
pub const MAX_EXPIRES_IN: u64 = 7 * 24 * 60 * 60;

type HmacSha256 = Hmac<Sha256>;

/// Inputs to a POST policy signature
#[derive(Debug, Clone)]
pub struct PostPolicy<'a> {
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    pub region: &'a str,
    pub endpoint: &'a str,
    pub bucket: &'a str,
    pub key: &'a str,
    pub expires_in: u64,
}

impl PostPolicy<'_> {
    /// Sign the policy as of `now`
    pub fn sign(&self, now: DateTime<Utc>) -> Result<PresignedPost> {
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return Err(CosError::Signing("credentials are empty".to_string()));
        }
        if self.expires_in > MAX_EXPIRES_IN {
            return Err(CosError::Signing(format!(
                "expires_in {} exceeds the maximum of {} seconds",
                self.expires_in, MAX_EXPIRES_IN
            )));
        }

        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let credential = format!(
            "{}/{}/{}/s3/aws4_request",
            self.access_key_id, date_stamp, self.region
        );

        let expiration = now + Duration::seconds(self.expires_in as i64);
        let policy = serde_json::json!({
            "expiration": expiration.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            "conditions": [
                { "bucket": self.bucket },
                { "key": self.key },
                { "x-amz-algorithm": ALGORITHM },
                { "x-amz-credential": credential },
                { "x-amz-date": amz_date },
            ],
        });
        let encoded_policy = B64.encode(policy.to_string());

        let k_date = hmac_sha256(
            format!("AWS4{}", self.secret_access_key).as_bytes(),
            date_stamp.as_bytes(),
        )?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, b"s3")?;
        let k_signing = hmac_sha256(&k_service, b"aws4_request")?;
        let signature = hex::encode(hmac_sha256(&k_signing, encoded_policy.as_bytes())?);

        let mut fields = BTreeMap::new();
        fields.insert("key".to_string(), self.key.to_string());
        fields.insert("x-amz-algorithm".to_string(), ALGORITHM.to_string());
        fields.insert("x-amz-credential".to_string(), credential);
        fields.insert("x-amz-date".to_string(), amz_date);
        fields.insert("policy".to_string(), encoded_policy);
        fields.insert("x-amz-signature".to_string(), signature);

        Ok(PresignedPost {
            url: format!("{}/{}", self.endpoint.trim_end_matches('/'), self.bucket),
            fields,
            expires_in: self.expires_in,
        })
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| CosError::Signing(format!("invalid HMAC key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
