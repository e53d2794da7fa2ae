//! Document storage buckets and signed download URLs
//!
//! Files live in fixed buckets keyed by document category. Downloads go
//! through short-lived signed URLs so the file server never needs the
//! caller's credentials: the gateway authorizes the request, signs
//! `bucket/path` with an expiry, and the file endpoint only has to verify
//! the signature.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::config::StorageConfig;
use crate::errors::{AppError, Result};

/// Fixed set of document buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageBucket {
    UnderwritingDocuments,
    AcordForms,
    UserAvatars,
    QuoteDocuments,
    PolicyDocuments,
    OtherDocuments,
}

impl StorageBucket {
    pub const ALL: [StorageBucket; 6] = [
        StorageBucket::UnderwritingDocuments,
        StorageBucket::AcordForms,
        StorageBucket::UserAvatars,
        StorageBucket::QuoteDocuments,
        StorageBucket::PolicyDocuments,
        StorageBucket::OtherDocuments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBucket::UnderwritingDocuments => "underwriting-documents",
            StorageBucket::AcordForms => "acord-forms",
            StorageBucket::UserAvatars => "user-avatars",
            StorageBucket::QuoteDocuments => "quote-documents",
            StorageBucket::PolicyDocuments => "policy-documents",
            StorageBucket::OtherDocuments => "other-documents",
        }
    }
}

impl fmt::Display for StorageBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBucket {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "underwriting-documents" => Ok(StorageBucket::UnderwritingDocuments),
            "acord-forms" => Ok(StorageBucket::AcordForms),
            "user-avatars" => Ok(StorageBucket::UserAvatars),
            "quote-documents" => Ok(StorageBucket::QuoteDocuments),
            "policy-documents" => Ok(StorageBucket::PolicyDocuments),
            "other-documents" => Ok(StorageBucket::OtherDocuments),
            other => Err(AppError::validation(format!("Unknown bucket: {}", other))),
        }
    }
}

/// Signs and verifies download URLs
#[derive(Clone)]
pub struct UrlSigner {
    secret: String,
    public_base_url: String,
    ttl_secs: u64,
}

impl UrlSigner {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            secret: config.signing_secret.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            ttl_secs: config.url_ttl_secs,
        }
    }

    fn signature(&self, bucket: StorageBucket, path: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(bucket.as_str().as_bytes());
        hasher.update(b"/");
        hasher.update(path.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(expires.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Build a signed download URL that expires after the configured TTL
    pub fn signed_url(&self, bucket: StorageBucket, path: &str) -> Result<String> {
        // Path traversal never reaches the signer
        if path.is_empty() || path.contains("..") || path.starts_with('/') {
            return Err(AppError::validation("Invalid storage path"));
        }

        let expires = Utc::now().timestamp() + self.ttl_secs as i64;
        let sig = self.signature(bucket, path, expires);
        Ok(format!(
            "{}/api/storage/file/{}/{}?expires={}&signature={}",
            self.public_base_url, bucket, path, expires, sig
        ))
    }

    /// Verify a presented signature against the path and expiry
    pub fn verify(
        &self,
        bucket: StorageBucket,
        path: &str,
        expires: i64,
        signature: &str,
    ) -> Result<()> {
        if Utc::now().timestamp() > expires {
            return Err(AppError::Unauthorized {
                message: "Download link expired".to_string(),
            });
        }

        let expected = self.signature(bucket, path, expires);
        if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
            return Err(AppError::Unauthorized {
                message: "Invalid download signature".to_string(),
            });
        }

        Ok(())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> UrlSigner {
        UrlSigner::new(&StorageConfig {
            root: "/tmp/policydesk-storage".into(),
            public_base_url: "http://localhost:8080/".into(),
            signing_secret: "test-secret".into(),
            url_ttl_secs: 900,
        })
    }

    #[test]
    fn test_bucket_round_trip() {
        for bucket in StorageBucket::ALL {
            assert_eq!(bucket.as_str().parse::<StorageBucket>().unwrap(), bucket);
        }
        assert!("secret-bucket".parse::<StorageBucket>().is_err());
    }

    #[test]
    fn test_signed_url_verifies() {
        let signer = signer();
        let url = signer
            .signed_url(StorageBucket::QuoteDocuments, "ws1/quote.pdf")
            .unwrap();

        let expires: i64 = url
            .split("expires=")
            .nth(1)
            .and_then(|s| s.split('&').next())
            .unwrap()
            .parse()
            .unwrap();
        let signature = url.split("signature=").nth(1).unwrap();

        signer
            .verify(StorageBucket::QuoteDocuments, "ws1/quote.pdf", expires, signature)
            .unwrap();

        // Same signature is invalid for a different path or bucket
        assert!(signer
            .verify(StorageBucket::QuoteDocuments, "ws1/other.pdf", expires, signature)
            .is_err());
        assert!(signer
            .verify(StorageBucket::AcordForms, "ws1/quote.pdf", expires, signature)
            .is_err());
    }

    #[test]
    fn test_expired_signature_rejected() {
        let signer = signer();
        let expires = Utc::now().timestamp() - 10;
        let sig = signer.signature(StorageBucket::OtherDocuments, "a/b.pdf", expires);
        let err = signer
            .verify(StorageBucket::OtherDocuments, "a/b.pdf", expires, &sig)
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }

    #[test]
    fn test_path_traversal_rejected() {
        let signer = signer();
        assert!(signer
            .signed_url(StorageBucket::UserAvatars, "../etc/passwd")
            .is_err());
        assert!(signer.signed_url(StorageBucket::UserAvatars, "/abs").is_err());
    }
}
