//! Blob storage collaborator.
//!
//! The build pipeline and the retriever exchange artifacts — corpus
//! text, the serialized index, the chunk mapping — through a store of
//! named objects within a fixed bucket. [`BlobStore`] is the boundary;
//! [`S3BlobStore`] implements it against any S3-compatible endpoint
//! using the S3 REST API with AWS Signature V4 authentication, and
//! [`MemoryBlobStore`] backs tests.
//!
//! Uses only pure-Rust dependencies (`hmac`, `sha2`) for request signing
//! — no C library dependencies, making it compatible with all build
//! environments.
//!
//! # Environment Variables
//!
//! Credentials are read from environment variables:
//! - `AWS_ACCESS_KEY_ID` — required
//! - `AWS_SECRET_ACCESS_KEY` — required
//! - `AWS_SESSION_TOKEN` — optional (for temporary credentials)
//!
//! # Authentication
//!
//! All requests are signed using
//! [AWS Signature Version 4](https://docs.aws.amazon.com/AmazonS3/latest/API/sigv4-auth-using-authorization-header.html).

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::config::StorageConfig;

type HmacSha256 = Hmac<Sha256>;

/// Durable storage for build artifacts, addressed by object name within
/// a fixed bucket.
///
/// Fetch failures propagate as-is (no internal retries); callers that
/// cache loaded artifacts must leave their cache empty on failure so the
/// next call retries the full fetch.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Download an object and decode it as UTF-8 text.
    async fn download_text(&self, name: &str) -> Result<String>;

    /// Download an object to a local file.
    async fn download_to_local(&self, name: &str, local_path: &Path) -> Result<()>;

    /// Upload a local file under the given object name.
    async fn upload_from_local(&self, local_path: &Path, name: &str) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════
// S3-compatible store
// ═══════════════════════════════════════════════════════════════════════

/// Blob store backed by an S3-compatible service.
///
/// Supports custom endpoints (MinIO, LocalStack) via
/// `storage.endpoint_url`; otherwise targets
/// `<bucket>.s3.<region>.amazonaws.com`.
pub struct S3BlobStore {
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
    creds: AwsCredentials,
    client: reqwest::Client,
}

impl S3BlobStore {
    /// Create a store for the configured bucket. Credentials are read
    /// from the environment.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        Ok(Self {
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            endpoint_url: config.endpoint_url.clone(),
            creds: AwsCredentials::from_env()?,
            client: reqwest::Client::new(),
        })
    }

    /// Scheme and host for the configured bucket.
    fn scheme_and_host(&self) -> (&'static str, String) {
        if let Some(ref endpoint) = self.endpoint_url {
            let scheme = if endpoint.starts_with("http://") {
                "http"
            } else {
                "https"
            };
            let host = endpoint
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/')
                .to_string();
            (scheme, host)
        } else {
            (
                "https",
                format!("{}.s3.{}.amazonaws.com", self.bucket, self.region),
            )
        }
    }

    /// Sign a request for `key` with an empty canonical query string.
    fn sign(&self, method: &str, key: &str, payload_hash: &str) -> SignedRequest {
        let (scheme, host) = self.scheme_and_host();
        let encoded_key = key.split('/').map(uri_encode).collect::<Vec<_>>().join("/");
        let canonical_uri = format!("/{}", encoded_key);
        let url = format!("{}://{}{}", scheme, host, canonical_uri);

        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let mut headers = vec![
            ("host".to_string(), host),
            ("x-amz-content-sha256".to_string(), payload_hash.to_string()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(ref token) = self.creds.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_headers: String = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v))
            .collect();

        let canonical_request = format!(
            "{}\n{}\n\n{}\n{}\n{}",
            method, canonical_uri, canonical_headers, signed_headers, payload_hash
        );

        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            hex_sha256(canonical_request.as_bytes())
        );

        let signing_key = derive_signing_key(
            &self.creds.secret_access_key,
            &date_stamp,
            &self.region,
            "s3",
        );
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.creds.access_key_id, credential_scope, signed_headers, signature
        );

        SignedRequest {
            url,
            authorization,
            amz_date,
            payload_hash: payload_hash.to_string(),
            session_token: self.creds.session_token.clone(),
        }
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let signed = self.sign("GET", key, &hex_sha256(b""));

        let mut req = self
            .client
            .get(&signed.url)
            .header("Authorization", &signed.authorization)
            .header("x-amz-content-sha256", &signed.payload_hash)
            .header("x-amz-date", &signed.amz_date);
        if let Some(ref token) = signed.session_token {
            req = req.header("x-amz-security-token", token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get s3://{}/{}: {}", self.bucket, key, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            bail!("S3 GetObject failed (HTTP {}) for key '{}'", status, key);
        }

        Ok(resp.bytes().await?.to_vec())
    }

    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<()> {
        let signed = self.sign("PUT", key, &hex_sha256(&body));

        let mut req = self
            .client
            .put(&signed.url)
            .header("Authorization", &signed.authorization)
            .header("x-amz-content-sha256", &signed.payload_hash)
            .header("x-amz-date", &signed.amz_date)
            .body(body);
        if let Some(ref token) = signed.session_token {
            req = req.header("x-amz-security-token", token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to put s3://{}/{}: {}", self.bucket, key, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body_text = resp.text().await.unwrap_or_default();
            bail!(
                "S3 PutObject failed (HTTP {}) for key '{}': {}",
                status,
                key,
                body_text.chars().take(500).collect::<String>()
            );
        }

        Ok(())
    }
}

/// Everything needed to issue one signed request.
struct SignedRequest {
    url: String,
    authorization: String,
    amz_date: String,
    payload_hash: String,
    session_token: Option<String>,
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn download_text(&self, name: &str) -> Result<String> {
        let bytes = self.get_object(name).await?;
        String::from_utf8(bytes).with_context(|| format!("Object '{}' is not valid UTF-8", name))
    }

    async fn download_to_local(&self, name: &str, local_path: &Path) -> Result<()> {
        let bytes = self.get_object(name).await?;
        tokio::fs::write(local_path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", local_path.display()))
    }

    async fn upload_from_local(&self, local_path: &Path, name: &str) -> Result<()> {
        let body = tokio::fs::read(local_path)
            .await
            .with_context(|| format!("Failed to read {}", local_path.display()))?;
        self.put_object(name, body).await
    }
}

// ═══════════════════════════════════════════════════════════════════════
// AWS credentials + SigV4 helpers
// ═══════════════════════════════════════════════════════════════════════

/// AWS credentials loaded from environment variables.
struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl AwsCredentials {
    fn from_env() -> Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .context("AWS_ACCESS_KEY_ID environment variable not set")?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .context("AWS_SECRET_ACCESS_KEY environment variable not set")?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

/// Compute the hex-encoded SHA-256 hash of data.
fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute HMAC-SHA256 of data with the given key.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hex_hmac_sha256(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// Derive the AWS SigV4 signing key for a date, region, and service.
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// URI-encode a string per RFC 3986 (used in SigV4 canonical requests).
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

// ═══════════════════════════════════════════════════════════════════════
// In-memory store
// ═══════════════════════════════════════════════════════════════════════

/// In-memory blob store for tests.
///
/// Tracks how many downloads it has served so tests can assert that
/// lazy loading fetches each artifact exactly once.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    downloads: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object directly, bypassing upload.
    pub fn put(&self, name: &str, bytes: Vec<u8>) {
        self.objects
            .write()
            .unwrap()
            .insert(name.to_string(), bytes);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.read().unwrap().contains_key(name)
    }

    /// Total downloads served across all objects.
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let objects = self.objects.read().unwrap();
        let bytes = objects
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("object '{}' not found", name))?;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(bytes)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn download_text(&self, name: &str) -> Result<String> {
        let bytes = self.fetch(name)?;
        String::from_utf8(bytes).with_context(|| format!("Object '{}' is not valid UTF-8", name))
    }

    async fn download_to_local(&self, name: &str, local_path: &Path) -> Result<()> {
        let bytes = self.fetch(name)?;
        tokio::fs::write(local_path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", local_path.display()))
    }

    async fn upload_from_local(&self, local_path: &Path, name: &str) -> Result<()> {
        let bytes = tokio::fs::read(local_path)
            .await
            .with_context(|| format!("Failed to read {}", local_path.display()))?;
        self.put(name, bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_encode_passes_unreserved() {
        assert_eq!(uri_encode("knowledge.txt"), "knowledge.txt");
        assert_eq!(uri_encode("A-Za-z0-9_.~"), "A-Za-z0-9_.~");
    }

    #[test]
    fn test_uri_encode_escapes_reserved() {
        assert_eq!(uri_encode("a b"), "a%20b");
        assert_eq!(uri_encode("a|b"), "a%7Cb");
    }

    #[test]
    fn test_derive_signing_key_matches_aws_example() {
        // Official worked example from the AWS SigV4 documentation.
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20150830",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryBlobStore::new();
        store.put("greeting.txt", b"hello".to_vec());
        assert_eq!(store.download_text("greeting.txt").await.unwrap(), "hello");
        assert_eq!(store.download_count(), 1);
        assert!(store.download_text("missing.txt").await.is_err());
    }
}
