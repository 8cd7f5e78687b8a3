//! # Domain Models
//!
//! The single entity of ZSki is a [`Post`]: one photo with optional caption,
//! author, free-text location and GPS coordinates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_AUTHOR: &str = "Anonymous";

/// A stored post, as returned by the persistence layer and the JSON API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Server-generated, immutable.
    pub id: i64,
    /// Either a `data:` URL or a public object URL.
    pub image_url: String,
    pub caption: String,
    pub author: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Assigned at insert; the feed's only sort key.
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Returns the coordinate pair only when both halves are present.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Insert payload. Coordinates travel as a pair so a half-tagged row cannot
/// be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub image_url: String,
    pub caption: String,
    pub author: String,
    pub location: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl NewPost {
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            caption: String::new(),
            author: DEFAULT_AUTHOR.to_string(),
            location: None,
            coordinates: None,
        }
    }

    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.longitude)
    }
}

/// Raw optional text fields of an upload form, before defaults are applied.
#[derive(Debug, Clone, Default)]
pub struct UploadFields {
    pub caption: Option<String>,
    pub author: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

impl UploadFields {
    /// Records a named text field. Unknown names are ignored.
    pub fn set(&mut self, name: &str, value: String) {
        let slot = match name {
            "caption" => &mut self.caption,
            "author" => &mut self.author,
            "location" => &mut self.location,
            "latitude" => &mut self.latitude,
            "longitude" => &mut self.longitude,
            _ => return,
        };
        *slot = Some(value);
    }

    /// Applies defaults and pairs up the coordinates.
    ///
    /// Empty strings count as absent. A coordinate that does not parse as a
    /// float is dropped, and a lone latitude or longitude drops both.
    pub fn into_new_post(self, image_url: String) -> NewPost {
        let latitude = parse_coordinate(self.latitude.as_deref());
        let longitude = parse_coordinate(self.longitude.as_deref());

        NewPost {
            image_url,
            caption: non_empty(self.caption).unwrap_or_default(),
            author: non_empty(self.author).unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            location: non_empty(self.location),
            coordinates: match (latitude, longitude) {
                (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
                _ => None,
            },
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_coordinate(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
