use serde::{Deserialize, Serialize};

/// Metadata returned by `GET /info` for a video URL, before any task exists.
///
/// Held only between "find" and "submit"; it is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoPreview {
    pub url: String,
    #[serde(default)]
    pub thumbnail: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
}

/// User-editable tag fields, seeded from a [`VideoPreview`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFields {
    pub title: String,
    pub slug: String,
    pub artist: String,
    pub album: String,
}

impl TagFields {
    /// Copy of the fields with surrounding whitespace removed.
    pub fn trimmed(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            slug: self.slug.trim().to_string(),
            artist: self.artist.trim().to_string(),
            album: self.album.trim().to_string(),
        }
    }
}

impl From<&VideoPreview> for TagFields {
    fn from(preview: &VideoPreview) -> Self {
        Self {
            title: preview.title.clone(),
            slug: preview.slug.clone(),
            artist: preview.artist.clone(),
            album: preview.album.clone(),
        }
    }
}

/// Body of `POST /tasks/`. Exactly the six task creation fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskBody {
    pub url: String,
    pub thumbnail: String,
    pub title: String,
    pub slug: String,
    pub artist: String,
    pub album: String,
}

impl CreateTaskBody {
    /// Combine the previewed video with the (trimmed) user overrides.
    pub fn from_preview(preview: &VideoPreview, tags: &TagFields) -> Self {
        let tags = tags.trimmed();
        Self {
            url: preview.url.clone(),
            thumbnail: preview.thumbnail.clone(),
            title: tags.title,
            slug: tags.slug,
            artist: tags.artist,
            album: tags.album,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preview() -> VideoPreview {
        VideoPreview {
            url: "https://youtu.be/abc".to_string(),
            thumbnail: "https://img/abc.jpg".to_string(),
            title: "Song Name".to_string(),
            slug: "song-name".to_string(),
            artist: String::new(),
            album: String::new(),
        }
    }

    #[test]
    fn test_preview_missing_optional_fields() {
        let json = r#"{"url":"https://youtu.be/abc","title":"Song","slug":"song"}"#;
        let parsed: VideoPreview = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.artist, "");
        assert_eq!(parsed.thumbnail, "");
    }

    #[test]
    fn test_preview_requires_url() {
        let json = r#"{"title":"Song","slug":"song"}"#;
        assert!(serde_json::from_str::<VideoPreview>(json).is_err());
    }

    #[test]
    fn test_create_body_uses_preview_url_and_trimmed_tags() {
        let tags = TagFields {
            title: "  New Title! ".to_string(),
            slug: "new-title ".to_string(),
            artist: " Someone".to_string(),
            album: String::new(),
        };
        let body = CreateTaskBody::from_preview(&preview(), &tags);
        assert_eq!(body.url, "https://youtu.be/abc");
        assert_eq!(body.thumbnail, "https://img/abc.jpg");
        assert_eq!(body.title, "New Title!");
        assert_eq!(body.slug, "new-title");
        assert_eq!(body.artist, "Someone");
        assert_eq!(body.album, "");
    }

    #[test]
    fn test_create_body_serializes_exactly_six_fields() {
        let body = CreateTaskBody::from_preview(&preview(), &TagFields::from(&preview()));
        let value = serde_json::to_value(&body).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 6);
        for key in ["url", "thumbnail", "title", "slug", "artist", "album"] {
            assert!(obj.contains_key(key), "missing {key}");
        }
    }
}
