//! # zs-ui
//!
//! Askama pages for the feed and the map. The feed renders client-side from
//! `/api/posts`; the map is rendered here from posts the handler already
//! fetched.

use askama::Template;
use zs_core::models::Post;

/// Where the map opens when nobody has tagged a photo yet (Attitash, NH).
pub const DEFAULT_CENTER: (f64, f64) = (44.0832, -71.2298);

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub title: &'a str,
}

#[derive(Template)]
#[template(path = "map.html")]
pub struct MapTemplate<'a> {
    pub title: &'a str,
    pub markers: Vec<MapMarker>,
    pub center: (f64, f64),
}

/// One pin on the map. Only geotagged posts become markers.
#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub latitude: f64,
    pub longitude: f64,
    pub image_url: String,
    pub author: String,
    /// Empty when the post has no location text.
    pub location: String,
    pub caption: String,
}

impl MapMarker {
    pub fn from_post(post: &Post) -> Option<Self> {
        let coordinates = post.coordinates()?;
        Some(Self {
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            image_url: post.image_url.clone(),
            author: post.author.clone(),
            location: post.location.clone().unwrap_or_default(),
            caption: post.caption.clone(),
        })
    }
}

impl<'a> MapTemplate<'a> {
    /// Keeps geotagged posts and centres on the newest of them.
    pub fn new(title: &'a str, posts: &[Post]) -> Self {
        let markers: Vec<MapMarker> = posts.iter().filter_map(MapMarker::from_post).collect();
        let center = markers
            .first()
            .map(|m| (m.latitude, m.longitude))
            .unwrap_or(DEFAULT_CENTER);
        Self { title, markers, center }
    }

    pub fn center_lat(&self) -> f64 {
        self.center.0
    }

    pub fn center_lng(&self) -> f64 {
        self.center.1
    }
}
