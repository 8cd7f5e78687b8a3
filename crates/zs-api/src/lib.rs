//! # zs-api
//!
//! The web routing and orchestration layer for ZSki.

pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use zs_core::traits::{BlobStore, PostRepo};

/// State shared across all requests. Built once by the binary.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn PostRepo>,
    pub store: Arc<dyn BlobStore>,
}

impl AppState {
    pub fn new(repo: Arc<dyn PostRepo>, store: Arc<dyn BlobStore>) -> Self {
        Self { repo, store }
    }
}

/// Configures the routes for the feed.
///
/// `upload_limit` caps the upload body in bytes; `None` lifts axum's
/// default cap entirely.
pub fn configure_routes(state: AppState, upload_limit: Option<usize>) -> Router {
    let body_limit = match upload_limit {
        Some(bytes) => DefaultBodyLimit::max(bytes),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/", get(handlers::feed_page))
        .route("/map", get(handlers::map_page))
        .route("/api/posts", get(handlers::list_posts))
        .route("/api/upload", post(handlers::upload).layer(body_limit))
        .route("/api/setup", get(handlers::setup))
        .layer(middleware::cors_policy())
        .layer(middleware::nosniff())
        .layer(middleware::referrer_policy())
        .layer(middleware::trace_layer())
        .with_state(state)
}
