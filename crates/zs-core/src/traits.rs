//! # Core Traits (Ports)
//!
//! Every plugin implements one of these. The binary picks exactly one
//! implementation of each at startup.

use async_trait::async_trait;
use bytes::Bytes;

use crate::filter::PostFilter;
use crate::models::{NewPost, Post};

/// Data persistence contract for posts.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepo: Send + Sync {
    /// Creates the posts table and any missing columns. Idempotent.
    async fn ensure_schema(&self) -> anyhow::Result<()>;

    /// Posts matching `filter`, newest first.
    async fn list_posts(&self, filter: &PostFilter) -> anyhow::Result<Vec<Post>>;

    /// Writes a row and returns it with its server-assigned id and timestamp.
    async fn insert_post(&self, post: NewPost) -> anyhow::Result<Post>;

    /// Releases the connection pool. Called once at shutdown.
    async fn close(&self);
}

/// Media storage contract for uploaded images.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores the bytes and returns a URL the browser can load directly.
    async fn store(&self, data: Bytes, content_type: &str, file_name: &str) -> anyhow::Result<String>;
}
