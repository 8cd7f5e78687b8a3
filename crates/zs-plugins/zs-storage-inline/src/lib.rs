//! # zs-storage-inline
//!
//! `BlobStore` that keeps the image inside the post row as a base64 `data:`
//! URL. Needs no object store at all, at the cost of fat rows.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use zs_core::blob::resolve_content_type;
use zs_core::traits::BlobStore;

#[derive(Debug, Default, Clone, Copy)]
pub struct InlineBlobStore;

impl InlineBlobStore {
    pub fn new() -> Self {
        Self
    }
}

pub fn data_url(data: &[u8], content_type: &str) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(data))
}

#[async_trait]
impl BlobStore for InlineBlobStore {
    async fn store(&self, data: Bytes, content_type: &str, file_name: &str) -> anyhow::Result<String> {
        let content_type = resolve_content_type(content_type, file_name);
        Ok(data_url(&data, &content_type))
    }
}
