//! # zs-api Handlers
//!
//! This module coordinates the flow between HTTP requests and Core traits.

use askama::Template;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Query, State};
use axum::response::Html;
use axum::Json;
use bytes::Bytes;
use chrono::Local;
use serde::Serialize;
use tracing::{debug, info};
use zs_core::error::AppError;
use zs_core::filter::{PostFilter, TimeWindow};
use zs_core::models::{Post, UploadFields};
use zs_ui::{IndexTemplate, MapTemplate};

use crate::error::ApiError;
use crate::AppState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Default, PartialEq)]
pub struct ListParams {
    pub location: Option<String>,
    pub time: Option<String>,
}

impl ListParams {
    /// The first value wins when a key repeats. Unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "location" => &mut params.location,
                "time" => &mut params.time,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        params
    }
}

#[derive(Debug, Serialize)]
pub struct SetupResponse {
    pub message: String,
}

struct UploadedFile {
    data: Bytes,
    content_type: String,
    file_name: String,
}

/// `GET /api/posts`: the feed, newest first, optionally filtered.
/// Time windows are evaluated in the server's local time zone.
pub async fn list_posts(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let Query(pairs) = query?;
    let params = ListParams::from_pairs(pairs);
    let window = TimeWindow::parse(params.time.as_deref());
    let filter = PostFilter::new(params.location, window, &Local::now());

    let posts = state.repo.list_posts(&filter).await?;
    debug!(?window, count = posts.len(), "listed posts");
    Ok(Json(posts))
}

/// `POST /api/upload`: stores the image, then inserts the row.
///
/// # Developer Note
/// The blob is written before the row. If the insert fails the blob stays
/// behind; nothing cleans it up.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Post>, ApiError> {
    let mut multipart = multipart?;
    let mut fields = UploadFields::default();
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == FILE_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let data = field.bytes().await?;
            file = Some(UploadedFile { data, content_type, file_name });
        } else {
            fields.set(&name, field.text().await?);
        }
    }

    // Browsers submit an empty part when no file was picked.
    let file = file
        .filter(|f| !f.data.is_empty())
        .ok_or_else(AppError::missing_file)?;

    let image_url = state
        .store
        .store(file.data, &file.content_type, &file.file_name)
        .await?;
    let post = state.repo.insert_post(fields.into_new_post(image_url)).await?;

    info!(id = post.id, author = %post.author, geotagged = post.coordinates().is_some(), "post created");
    Ok(Json(post))
}

/// `GET /api/setup`: creates or migrates the schema. Safe to call repeatedly.
pub async fn setup(State(state): State<AppState>) -> Result<Json<SetupResponse>, ApiError> {
    state.repo.ensure_schema().await?;
    info!("schema ensured");
    Ok(Json(SetupResponse {
        message: "Table created successfully".to_string(),
    }))
}

/// Renders the feed page (e.g., /)
pub async fn feed_page() -> Result<Html<String>, ApiError> {
    let html = IndexTemplate { title: "ZSki" }.render()?;
    Ok(Html(html))
}

/// Renders the map of geotagged posts (e.g., /map)
pub async fn map_page(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let posts = state.repo.list_posts(&PostFilter::default()).await?;
    let html = MapTemplate::new("ZSki map", &posts).render()?;
    Ok(Html(html))
}
