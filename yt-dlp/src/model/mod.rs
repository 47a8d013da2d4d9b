//! The models used to represent the data fetched by 'yt-dlp'.
//!
//! The represented data is the video information, thumbnails, and formats.

use crate::model::format::Format;
use crate::model::thumbnail::Thumbnail;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod format;
pub mod thumbnail;

/// Represents a video, the output of 'yt-dlp'.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    /// The ID of the video.
    pub id: String,
    /// The title of the video. Empty when 'yt-dlp' could only partially fetch the page.
    #[serde(default)]
    pub title: String,
    /// The description of the video.
    #[serde(default)]
    pub description: Option<String>,
    /// The upload date of the video, formatted as 'YYYYMMDD'.
    #[serde(default)]
    pub upload_date: Option<String>,

    /// The display name of the uploader.
    #[serde(default)]
    pub uploader: Option<String>,
    /// The channel display name.
    #[serde(default)]
    pub channel: Option<String>,

    /// The available formats of the video, in the order 'yt-dlp' lists them.
    #[serde(default)]
    pub formats: Vec<Format>,
    /// The thumbnails of the video.
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
}

impl Video {
    /// Returns the format with the given ID, if the video has one.
    pub fn format(&self, format_id: &str) -> Option<&Format> {
        self.formats.iter().find(|f| f.format_id == format_id)
    }

    /// Returns the IDs of all formats, in listing order.
    pub fn format_ids(&self) -> Vec<&str> {
        self.formats.iter().map(|f| f.format_id.as_str()).collect()
    }

    /// Returns the audio-only format with the highest audio bitrate.
    /// When several formats share the highest bitrate, the first listed one wins.
    /// If the video has no audio-only formats, it returns None.
    pub fn best_audio_only_format(&self) -> Option<&Format> {
        #[cfg(feature = "tracing")]
        tracing::trace!("Selecting best audio-only format for video: {}", self.id);

        self.formats
            .iter()
            .filter(|f| f.is_audio_only())
            .fold(None, |best: Option<&Format>, candidate| match best {
                Some(current) if candidate.audio_bitrate() <= current.audio_bitrate() => {
                    Some(current)
                }
                _ => Some(candidate),
            })
    }
}

// Implementation of the Display trait for Video
impl fmt::Display for Video {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Video(id = {}, title = \"{}\", formats = {})",
            self.id,
            self.title,
            self.formats.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(formats: serde_json::Value) -> Video {
        serde_json::from_value(serde_json::json!({
            "id": "dQw4w9WgXcQ",
            "title": "Never Gonna Give You Up",
            "formats": formats,
        }))
        .unwrap()
    }

    #[test]
    fn best_audio_only_prefers_highest_bitrate() {
        let video = video(serde_json::json!([
            {"format_id": "249", "ext": "webm", "vcodec": "none", "acodec": "opus", "abr": 96.0},
            {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2", "abr": 128.0},
            {"format_id": "22", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a.40.2", "abr": 192.0},
        ]));

        assert_eq!(video.best_audio_only_format().unwrap().format_id, "140");
    }

    #[test]
    fn best_audio_only_keeps_first_on_ties() {
        let video = video(serde_json::json!([
            {"format_id": "139", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.5", "abr": 128.0},
            {"format_id": "251", "ext": "webm", "vcodec": "none", "acodec": "opus", "abr": 128.0},
        ]));

        assert_eq!(video.best_audio_only_format().unwrap().format_id, "139");
    }

    #[test]
    fn best_audio_only_is_none_without_audio_formats() {
        let video = video(serde_json::json!([
            {"format_id": "137", "ext": "mp4", "vcodec": "avc1", "acodec": "none"},
        ]));

        assert!(video.best_audio_only_format().is_none());
    }

    #[test]
    fn format_lookup_matches_ids_as_strings() {
        let video = video(serde_json::json!([
            {"format_id": "18", "ext": "mp4"},
            {"format_id": "137", "ext": "mp4"},
        ]));

        assert_eq!(video.format("137").unwrap().format_id, "137");
        assert!(video.format("013").is_none());
        assert_eq!(video.format_ids(), vec!["18", "137"]);
    }

    #[test]
    fn partial_metadata_deserializes() {
        let video: Video = serde_json::from_str(
            r#"{"id": "x", "title": "", "uploader": null, "thumbnails": [{"url": "https://i.ytimg.com/a.jpg"}]}"#,
        )
        .unwrap();

        assert!(video.title.is_empty());
        assert!(video.formats.is_empty());
        assert_eq!(video.thumbnails[0].width, None);
    }
}
