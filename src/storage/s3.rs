// backuptool/src/storage/s3.rs
//
// S3-compatible backend over raw signed HTTP. No SDK: every request is a
// plain PUT/GET/HEAD/DELETE with hand-computed SigV4 headers.
use async_trait::async_trait;
use chrono::Utc;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, Method};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use url::Url;
use uuid::Uuid;

use crate::config::S3StorageConfig;
use crate::errors::{AppError, Result};

use super::sigv4::{self, EMPTY_PAYLOAD_SHA256, SigningRequest};
use super::{BackupMetadata, METADATA_FILENAME, StorageBackend, StorageKind};

const KEY_SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

pub struct S3StorageBackend {
    config: S3StorageConfig,
    client: Client,
    scheme: String,
    host: String,
}

impl S3StorageBackend {
    pub fn new(config: S3StorageConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        // Virtual-hosted addressing: bucket.s3.region.amazonaws.com by
        // default, bucket.<endpoint host> for S3-compatible services.
        let (scheme, host) = match &config.endpoint_url {
            Some(endpoint) => {
                let parsed = Url::parse(endpoint)?;
                let endpoint_host = parsed.host_str().ok_or_else(|| {
                    AppError::Config(format!("s3_storage.endpoint_url has no host: {}", endpoint))
                })?;
                let mut host = format!("{}.{}", config.bucket_name, endpoint_host);
                if let Some(port) = parsed.port() {
                    host.push_str(&format!(":{}", port));
                }
                (parsed.scheme().to_string(), host)
            }
            None => (
                "https".to_string(),
                format!("{}.s3.{}.amazonaws.com", config.bucket_name, config.region),
            ),
        };

        Ok(Self {
            config,
            client,
            scheme,
            host,
        })
    }

    fn artifact_key(&self, level: &str, filename: &str) -> String {
        match &self.config.folder_prefix {
            Some(prefix) => format!("{}/{}/{}", prefix.trim_matches('/'), level, filename),
            None => format!("{}/{}", level, filename),
        }
    }

    fn metadata_key(&self) -> String {
        match &self.config.folder_prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_matches('/'), METADATA_FILENAME),
            None => METADATA_FILENAME.to_string(),
        }
    }

    fn canonical_uri(key: &str) -> String {
        format!("/{}", utf8_percent_encode(key, KEY_SEGMENT_ENCODE_SET))
    }

    fn build_signed_request(
        &self,
        method: Method,
        key: &str,
        payload_hash: &str,
        body: Option<(reqwest::Body, u64)>,
    ) -> reqwest::RequestBuilder {
        let canonical_uri = Self::canonical_uri(key);
        let url = format!("{}://{}{}", self.scheme, self.host, canonical_uri);

        let signed = sigv4::sign(&SigningRequest {
            method: method.as_str(),
            canonical_uri: &canonical_uri,
            canonical_query: "",
            host: &self.host,
            payload_hash,
            access_key: &self.config.access_key_id,
            secret_key: &self.config.secret_access_key,
            region: &self.config.region,
            timestamp: Utc::now(),
        });

        let mut request = self
            .client
            .request(method, &url)
            .header("Host", &self.host)
            .header("x-amz-date", &signed.amz_date)
            .header("x-amz-content-sha256", &signed.content_sha256)
            .header("Authorization", &signed.authorization);
        if let Some((body, content_length)) = body {
            // A plainly signed PUT must not go out chunked: S3 answers
            // 501 MissingContentLength, so the length is set explicitly
            // even for streaming bodies.
            request = request
                .header(reqwest::header::CONTENT_LENGTH, content_length)
                .body(body);
        }
        request
    }

    async fn signed_request(
        &self,
        method: Method,
        key: &str,
        payload_hash: &str,
        body: Option<(reqwest::Body, u64)>,
    ) -> Result<reqwest::Response> {
        Ok(self
            .build_signed_request(method, key, payload_hash, body)
            .send()
            .await?)
    }

    async fn put_bytes(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let payload_hash = sigv4::hex_sha256(&bytes);
        let content_length = bytes.len() as u64;
        let response = self
            .signed_request(
                Method::PUT,
                key,
                &payload_hash,
                Some((bytes.into(), content_length)),
            )
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn load_metadata(&self) -> Result<Vec<BackupMetadata>> {
        let response = self
            .signed_request(Method::GET, &self.metadata_key(), EMPTY_PAYLOAD_SHA256, None)
            .await?;
        // A bucket with no backups yet simply has no metadata object.
        if response.status().as_u16() == 404 {
            return Ok(Vec::new());
        }
        let response = ensure_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn store_metadata(&self, entries: &[BackupMetadata]) -> Result<()> {
        // Last writer wins; there is no conditional PUT on the metadata
        // object, matching the local sidecar's read-modify-write behavior.
        let body = serde_json::to_vec_pretty(entries)?;
        self.put_bytes(&self.metadata_key(), body).await
    }

    async fn find(&self, id: Uuid) -> Result<Option<BackupMetadata>> {
        Ok(self.load_metadata().await?.into_iter().find(|m| m.id == id))
    }
}

#[async_trait]
impl StorageBackend for S3StorageBackend {
    fn kind(&self) -> StorageKind {
        StorageKind::S3
    }

    async fn save(&self, artifact_path: &Path, metadata: &BackupMetadata) -> Result<String> {
        let key = self.artifact_key(metadata.level.as_str(), &metadata.filename);

        // metadata.checksum is the digest of exactly the bytes being sent,
        // so it doubles as the SigV4 payload hash. The file itself streams;
        // metadata.size provides the Content-Length the stream cannot.
        let file = tokio::fs::File::open(artifact_path).await?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let response = self
            .signed_request(Method::PUT, &key, &metadata.checksum, Some((body, metadata.size)))
            .await?;
        ensure_success(response).await?;

        let mut entries = self.load_metadata().await?;
        entries.push(metadata.clone());
        self.store_metadata(&entries).await?;

        Ok(format!("s3://{}/{}", self.config.bucket_name, key))
    }

    async fn retrieve(&self, id: Uuid) -> Result<PathBuf> {
        let metadata = self.find(id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Backup {} not found in s3 storage", id))
        })?;
        let key = self.artifact_key(metadata.level.as_str(), &metadata.filename);

        let response = self
            .signed_request(Method::GET, &key, EMPTY_PAYLOAD_SHA256, None)
            .await?;
        if response.status().as_u16() == 404 {
            return Err(AppError::NotFound(format!(
                "Artifact object missing for backup {}: s3://{}/{}",
                id, self.config.bucket_name, key
            )));
        }
        let mut response = ensure_success(response).await?;

        let temp = tempfile::Builder::new()
            .prefix("backuptool-")
            .suffix(&format!("-{}", metadata.filename))
            .tempfile()?;
        let (_, temp_path) = temp.keep().map_err(|e| AppError::Io(e.error))?;
        let mut output = tokio::fs::File::create(&temp_path).await?;
        while let Some(chunk) = response.chunk().await? {
            output.write_all(&chunk).await?;
        }
        output.flush().await?;
        Ok(temp_path)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut entries = self.load_metadata().await?;
        let Some(position) = entries.iter().position(|m| m.id == id) else {
            return Ok(false);
        };
        let metadata = entries.remove(position);
        let key = self.artifact_key(metadata.level.as_str(), &metadata.filename);

        let response = self
            .signed_request(Method::DELETE, &key, EMPTY_PAYLOAD_SHA256, None)
            .await?;
        // DELETE of an already-missing object is not an error.
        if !response.status().is_success() && response.status().as_u16() != 404 {
            return Err(transport_error(response).await);
        }

        self.store_metadata(&entries).await?;
        Ok(true)
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        let Some(metadata) = self.find(id).await? else {
            return Ok(false);
        };
        let key = self.artifact_key(metadata.level.as_str(), &metadata.filename);
        let response = self
            .signed_request(Method::HEAD, &key, EMPTY_PAYLOAD_SHA256, None)
            .await?;
        if response.status().is_success() {
            return Ok(true);
        }
        if response.status().as_u16() == 404 {
            return Ok(false);
        }
        Err(transport_error(response).await)
    }

    async fn list(&self) -> Result<Vec<BackupMetadata>> {
        self.load_metadata().await
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(transport_error(response).await)
    }
}

async fn transport_error(response: reqwest::Response) -> AppError {
    let status = response.status().as_u16();
    let body: String = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(512)
        .collect();
    AppError::Transport { status, body }
}
