//! Media asset model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Image extensions accepted into the catalog
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Video extensions accepted into the catalog
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov"];

/// Query string appended to stored image URLs for grid thumbnails
const THUMBNAIL_TRANSFORM: &str = "width=300&height=200&resize=cover";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            MediaType::Image => IMAGE_EXTENSIONS,
            MediaType::Video => VIDEO_EXTENSIONS,
        }
    }

    /// Classify a file name by extension, restricted to `allowed` types
    ///
    /// Returns `None` for names whose extension is not in the allow-list.
    pub fn from_file_name(name: &str, allowed: &[MediaType]) -> Option<MediaType> {
        let ext = file_extension(name);
        allowed
            .iter()
            .copied()
            .find(|t| t.extensions().contains(&ext.as_str()))
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower-cased text after the last `.`; the whole name when there is no dot
pub fn file_extension(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_lowercase()
}

/// One entry of the media catalog
///
/// Either an object in the blob store or one of the built-in defaults, which
/// are never deleted and never counted toward storage size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Object name in the bucket; doubles as the asset identifier
    pub name: String,
    pub url: String,
    pub media_type: MediaType,
    /// Size in bytes (0 when unknown)
    pub size: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub is_default: bool,
}

impl MediaAsset {
    pub fn id(&self) -> &str {
        &self.name
    }

    /// Built-in asset shipped with the site
    pub fn builtin(name: impl Into<String>, url: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            media_type,
            size: 0,
            created_at: None,
            is_default: true,
        }
    }

    /// URL used for grid thumbnails
    ///
    /// Defaults and videos are served as-is; stored images go through the
    /// backend's resize transform.
    pub fn thumbnail_url(&self) -> String {
        if self.is_default || self.media_type == MediaType::Video {
            return self.url.clone();
        }
        format!("{}?{}", self.url, THUMBNAIL_TRANSFORM)
    }

    /// Creation time in millis, missing timestamps sort as the epoch
    pub fn created_millis(&self) -> i64 {
        self.created_at.map(|t| t.timestamp_millis()).unwrap_or(0)
    }
}

/// Human readable size (`512 B`, `1.5 KB`, `2.0 MB`, ...)
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[MediaType] = &[MediaType::Image, MediaType::Video];

    #[test]
    fn test_type_from_extension() {
        assert_eq!(MediaType::from_file_name("x.png", ALL), Some(MediaType::Image));
        assert_eq!(MediaType::from_file_name("x.JPEG", ALL), Some(MediaType::Image));
        assert_eq!(MediaType::from_file_name("x.mp4", ALL), Some(MediaType::Video));
        assert_eq!(MediaType::from_file_name("clip.final.mov", ALL), Some(MediaType::Video));
        assert_eq!(MediaType::from_file_name("x.txt", ALL), None);
        assert_eq!(MediaType::from_file_name("png", ALL), Some(MediaType::Image));
        assert_eq!(MediaType::from_file_name("README", ALL), None);
    }

    #[test]
    fn test_allow_list_restricts_types() {
        assert_eq!(MediaType::from_file_name("x.mp4", &[MediaType::Image]), None);
        assert_eq!(
            MediaType::from_file_name("x.gif", &[MediaType::Image]),
            Some(MediaType::Image)
        );
    }

    #[test]
    fn test_thumbnail_url() {
        let image = MediaAsset {
            name: "a.png".into(),
            url: "https://cdn/a.png".into(),
            media_type: MediaType::Image,
            size: 10,
            created_at: None,
            is_default: false,
        };
        assert_eq!(
            image.thumbnail_url(),
            "https://cdn/a.png?width=300&height=200&resize=cover"
        );

        let video = MediaAsset {
            media_type: MediaType::Video,
            ..image.clone()
        };
        assert_eq!(video.thumbnail_url(), "https://cdn/a.png");

        let builtin = MediaAsset::builtin("Hero", "/hero.mp4", MediaType::Video);
        assert_eq!(builtin.thumbnail_url(), "/hero.mp4");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
