//! # zs-storage-local
//! zski/crates/zs-plugins/zs-storage-local/src/lib.rs
//! Local filesystem implementation of `BlobStore`.
//! Files land flat under one directory that the binary serves statically.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;
use zs_core::blob::generate_object_name;
use zs_core::traits::BlobStore;

pub struct LocalBlobStore {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix the root is served under (e.g., "/uploads")
    url_prefix: String,
}

impl LocalBlobStore {
    pub fn new(root: PathBuf, url_prefix: impl Into<String>) -> Self {
        let url_prefix = url_prefix.into().trim_end_matches('/').to_string();
        Self { root_path: root, url_prefix }
    }

    fn url_for(&self, file_name: &str) -> String {
        format!("{}/{}", self.url_prefix, file_name)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    /// Writes the upload under a fresh UUID name. Identical uploads get
    /// separate files.
    async fn store(&self, data: Bytes, content_type: &str, file_name: &str) -> anyhow::Result<String> {
        let object_name = generate_object_name(file_name, content_type);
        let target_path = self.root_path.join(&object_name);

        fs::create_dir_all(&self.root_path).await?;
        fs::write(&target_path, &data).await?;

        debug!(path = %target_path.display(), bytes = data.len(), "stored upload");
        Ok(self.url_for(&object_name))
    }
}
