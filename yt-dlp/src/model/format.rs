//! Formats-related models.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The codec value 'yt-dlp' reports when a format carries no stream of that kind.
pub const NO_CODEC: &str = "none";

/// Represents one available format of a video, i.e. one encoded rendition.
///
/// A format is a snapshot of a single 'yt-dlp' call and is never updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Format {
    /// The ID of the format, e.g. '137' or '140'. Unique within one video.
    pub format_id: String,
    /// The container extension of the format, e.g. 'mp4' or 'webm'.
    #[serde(default)]
    pub ext: String,

    /// The video codec, `"none"` for audio-only formats.
    #[serde(default)]
    pub vcodec: Option<String>,
    /// The audio codec, `"none"` for video-only formats.
    #[serde(default)]
    pub acodec: Option<String>,

    /// The resolution label, e.g. '1920x1080' or 'audio only'.
    #[serde(default)]
    pub resolution: Option<String>,
    /// The width of the video, in pixels.
    #[serde(default)]
    pub width: Option<u32>,
    /// The height of the video, in pixels.
    #[serde(default)]
    pub height: Option<u32>,

    /// The audio bitrate, in kbps.
    #[serde(default)]
    pub abr: Option<OrderedFloat<f64>>,
    /// The total bitrate, in kbps.
    #[serde(default)]
    pub tbr: Option<OrderedFloat<f64>>,

    /// A human-readable note, e.g. '1080p' or 'medium'.
    #[serde(default)]
    pub format_note: Option<String>,
}

impl Format {
    /// Returns true if the format explicitly reports no video stream.
    pub fn lacks_video(&self) -> bool {
        self.vcodec.as_deref() == Some(NO_CODEC)
    }

    /// Returns true if the format explicitly reports no audio stream.
    /// A format without any audio codec information is not considered lacking audio.
    pub fn lacks_audio(&self) -> bool {
        self.acodec.as_deref() == Some(NO_CODEC)
    }

    /// Returns true if the format carries an audio stream and no video stream.
    pub fn is_audio_only(&self) -> bool {
        self.lacks_video() && !self.lacks_audio()
    }

    /// Returns the audio bitrate, 0 when unknown.
    pub fn audio_bitrate(&self) -> OrderedFloat<f64> {
        self.abr.unwrap_or(OrderedFloat(0.0))
    }
}

// Implementation of the Display trait for Format
impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Format(id={}, ext={}, vcodec={}, acodec={}, resolution={})",
            self.format_id,
            self.ext,
            self.vcodec.as_deref().unwrap_or("unknown"),
            self.acodec.as_deref().unwrap_or("unknown"),
            self.resolution.as_deref().unwrap_or("unknown")
        )
    }
}
