use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Where a room's media comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    /// Externally hosted stream (YouTube and similar embeds)
    #[serde(rename = "youtube")]
    ExternalStream,
    /// Direct link to a media file
    #[serde(rename = "url")]
    DirectUrl,
    /// Publicly shared Google Drive file, played through the drive proxy
    #[serde(rename = "gdrive")]
    DriveShare,
    /// File uploaded to this server and served from `/media`
    #[serde(rename = "upload")]
    Upload,
}

/// The media a room is watching. Replaced wholesale, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSource {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl MediaSource {
    /// Maximum accepted locator length
    pub const MAX_URL_LEN: usize = 4096;

    #[must_use]
    pub fn new(kind: MediaKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            title: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::InvalidInput("Media url must not be empty".to_string()));
        }
        if self.url.len() > Self::MAX_URL_LEN {
            return Err(Error::InvalidInput(format!(
                "Media url too long (max {} bytes)",
                Self::MAX_URL_LEN
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_wire_names() {
        let media: MediaSource =
            serde_json::from_str(r#"{"type":"gdrive","url":"/drive/proxy?id=abc"}"#).unwrap();
        assert_eq!(media.kind, MediaKind::DriveShare);
        assert!(media.title.is_none());

        let json = serde_json::to_value(MediaSource::new(MediaKind::Upload, "/media/x.mp4")).unwrap();
        assert_eq!(json["type"], "upload");
        assert!(json.get("title").is_none());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(serde_json::from_str::<MediaSource>(r#"{"type":"vhs","url":"x"}"#).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(MediaSource::new(MediaKind::DirectUrl, "https://x/y.mp4").validate().is_ok());
        assert!(MediaSource::new(MediaKind::DirectUrl, "   ").validate().is_err());
    }
}
