//! # zs-storage-s3
//!
//! `BlobStore` backed by an S3-compatible bucket (AWS S3, Supabase Storage,
//! MinIO, R2, ...). Objects are written under `uploads/` with generated names
//! and served from the bucket's public base URL; ZSki never proxies them.
//!
//! Credentials come from the standard AWS provider chain
//! (`AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`, profiles, IMDS).

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::{debug, info};
use zs_core::blob::{generate_object_name, resolve_content_type};
use zs_core::traits::BlobStore;

const KEY_PREFIX: &str = "uploads";

/// Where and how to reach the bucket.
#[derive(Debug, Clone)]
pub struct S3StoreConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores. Enables path-style URLs.
    pub endpoint: Option<String>,
    /// Public base URL objects are readable from, without the key.
    pub public_url: String,
}

impl S3StoreConfig {
    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url.trim_end_matches('/'), key)
    }
}

#[derive(Clone)]
pub struct S3BlobStore {
    client: Arc<Client>,
    config: S3StoreConfig,
}

impl S3BlobStore {
    /// Builds the client from the environment plus `config`.
    pub async fn connect(config: S3StoreConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.endpoint.is_some())
            .build();

        info!(bucket = %config.bucket, region = %config.region, "configured s3 blob store");
        Self {
            client: Arc::new(Client::from_conf(s3_config)),
            config,
        }
    }

    /// Health check for bucket reachability, run once at startup.
    pub async fn health_check(&self) -> anyhow::Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{}", DisplayErrorContext(e)))?;
        Ok(())
    }
}

fn object_key(file_name: &str, content_type: &str) -> String {
    format!("{KEY_PREFIX}/{}", generate_object_name(file_name, content_type))
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn store(&self, data: Bytes, content_type: &str, file_name: &str) -> anyhow::Result<String> {
        let content_type = resolve_content_type(content_type, file_name);
        let key = object_key(file_name, &content_type);
        let size = data.len();

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .content_type(&content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{}", DisplayErrorContext(e)))?;

        debug!(%key, size, "uploaded object");
        Ok(self.config.object_url(&key))
    }
}
