//! The format resolver: projects the formats of a video into a few named quality tiers.

use crate::error::{Error, Result};
use crate::provider::MetadataProvider;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use ytdlp_bridge::error::Error as ProviderError;
use ytdlp_bridge::model::Video;
use ytdlp_bridge::model::format::Format;
use ytdlp_bridge::model::thumbnail::Thumbnail;

/// The label of the best audio-only format, which isn't part of the tier table.
pub const AUDIO_LABEL: &str = "audio";

/// A label and the format IDs accepted for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityTier {
    pub label: String,
    pub format_ids: Vec<String>,
}

impl QualityTier {
    pub fn new(label: impl Into<String>, format_ids: &[&str]) -> Self {
        Self {
            label: label.into(),
            format_ids: format_ids.iter().map(|id| id.to_string()).collect(),
        }
    }

    fn accepts(&self, format_id: &str) -> bool {
        self.format_ids.iter().any(|id| id == format_id)
    }
}

/// The ordered tier table. Labels are unique, and every tier accepts at least one ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<QualityTier>", into = "Vec<QualityTier>")]
pub struct QualityTiers(Vec<QualityTier>);

impl QualityTiers {
    pub fn new(tiers: Vec<QualityTier>) -> Result<Self> {
        let mut labels = HashSet::new();

        for tier in &tiers {
            if tier.label.is_empty() {
                return Err(Error::Config("quality tier without a label".to_string()));
            }
            if tier.label == AUDIO_LABEL {
                return Err(Error::Config(format!(
                    "the '{AUDIO_LABEL}' label is reserved for the best audio-only format"
                )));
            }
            if tier.format_ids.is_empty() {
                return Err(Error::Config(format!(
                    "quality tier '{}' accepts no format",
                    tier.label
                )));
            }
            if !labels.insert(tier.label.as_str()) {
                return Err(Error::Config(format!(
                    "quality tier '{}' is defined twice",
                    tier.label
                )));
            }
        }

        Ok(Self(tiers))
    }

    pub fn iter(&self) -> impl Iterator<Item = &QualityTier> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for QualityTiers {
    fn default() -> Self {
        Self(vec![
            QualityTier::new("360p", &["18", "134", "243"]),
            QualityTier::new("720p", &["22", "136", "247"]),
            QualityTier::new("1080p", &["137", "248"]),
        ])
    }
}

impl TryFrom<Vec<QualityTier>> for QualityTiers {
    type Error = Error;

    fn try_from(tiers: Vec<QualityTier>) -> Result<Self> {
        Self::new(tiers)
    }
}

impl From<QualityTiers> for Vec<QualityTier> {
    fn from(tiers: QualityTiers) -> Self {
        tiers.0
    }
}

/// A format ID as clients see it: a number when it is one, a string otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Itag {
    Numeric(u64),
    Text(String),
}

impl From<&str> for Itag {
    fn from(format_id: &str) -> Self {
        match format_id.parse::<u64>() {
            Ok(id) if id.to_string() == format_id => Itag::Numeric(id),
            _ => Itag::Text(format_id.to_string()),
        }
    }
}

/// One surfaced format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatChoice {
    pub quality: String,
    pub itag: Itag,
    #[serde(rename = "type")]
    pub container: String,
}

impl FormatChoice {
    fn new(quality: &str, format: &Format) -> Self {
        Self {
            quality: quality.to_string(),
            itag: Itag::from(format.format_id.as_str()),
            container: format.ext.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThumbnailInfo {
    pub url: String,
    pub width: i64,
    pub height: i64,
}

impl From<&Thumbnail> for ThumbnailInfo {
    fn from(thumbnail: &Thumbnail) -> Self {
        Self {
            url: thumbnail.url.clone(),
            width: thumbnail.width.unwrap_or(0),
            height: thumbnail.height.unwrap_or(0),
        }
    }
}

/// The answer of the resolver: descriptive metadata and the surfaced formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVideo {
    pub title: String,
    pub author: String,
    pub description: String,
    pub thumbnails: Vec<ThumbnailInfo>,
    pub date: String,
    pub formats: Vec<FormatChoice>,
}

/// Resolves URLs into their metadata and quality tiers.
#[derive(Clone)]
pub struct FormatResolver {
    provider: Arc<dyn MetadataProvider>,
    tiers: Arc<QualityTiers>,
    metadata_timeout: Duration,
}

impl FormatResolver {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        tiers: QualityTiers,
        metadata_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            tiers: Arc::new(tiers),
            metadata_timeout,
        }
    }

    /// Fetches the metadata of `url` once, and projects it.
    ///
    /// # Errors
    ///
    /// [`Error::MetadataFetch`] if the provider fails or times out, [`Error::EmptyMetadata`] if
    /// its answer has no title.
    pub async fn resolve(&self, url: &str) -> Result<ResolvedVideo> {
        let video = fetch_metadata(self.provider.as_ref(), url, self.metadata_timeout).await?;
        let resolved = project(&video, &self.tiers);

        info!(
            "Resolved \"{}\" with {} of {} formats surfaced",
            resolved.title,
            resolved.formats.len(),
            video.formats.len()
        );
        Ok(resolved)
    }
}

/// Queries the provider for `url`, bounded by `timeout`, and rejects answers without a title.
pub(crate) async fn fetch_metadata(
    provider: &dyn MetadataProvider,
    url: &str,
    timeout: Duration,
) -> Result<Video> {
    debug!("Fetching video info for {}", url);

    let video = match tokio::time::timeout(timeout, provider.resolve(url)).await {
        Ok(Ok(video)) => video,
        Ok(Err(e)) => {
            warn!("Metadata provider failed for {}: {}", url, e);
            return Err(Error::MetadataFetch(e));
        }
        Err(_) => {
            warn!("Metadata provider timed out after {:?} for {}", timeout, url);
            return Err(Error::MetadataFetch(ProviderError::Timeout(timeout)));
        }
    };

    if video.title.is_empty() {
        warn!("Video title is empty for {} (partial fetch)", url);
        return Err(Error::EmptyMetadata);
    }

    debug!("Got {}", video);
    Ok(video)
}

/// Fills every tier with the first listed format it accepts, then appends the best
/// audio-only format.
pub fn project(video: &Video, tiers: &QualityTiers) -> ResolvedVideo {
    let mut filled = vec![false; tiers.len()];
    let mut formats = Vec::new();

    for format in &video.formats {
        for (tier, done) in tiers.iter().zip(filled.iter_mut()) {
            if !*done && tier.accepts(&format.format_id) {
                *done = true;
                formats.push(FormatChoice::new(&tier.label, format));
            }
        }
    }

    if let Some(audio) = video.best_audio_only_format() {
        formats.push(FormatChoice::new(AUDIO_LABEL, audio));
    }

    ResolvedVideo {
        title: video.title.clone(),
        author: video.uploader.clone().unwrap_or_default(),
        description: video.description.clone().unwrap_or_default(),
        thumbnails: video.thumbnails.iter().map(ThumbnailInfo::from).collect(),
        date: video.upload_date.clone().unwrap_or_default(),
        formats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StreamSelector;
    use async_trait::async_trait;
    use std::path::Path;

    fn video(formats: serde_json::Value) -> Video {
        serde_json::from_value(serde_json::json!({
            "id": "dQw4w9WgXcQ",
            "title": "Never Gonna Give You Up",
            "uploader": "Rick Astley",
            "upload_date": "20091025",
            "thumbnails": [{"url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hq720.jpg", "width": 1280, "height": 720}],
            "formats": formats,
        }))
        .unwrap()
    }

    fn qualities(resolved: &ResolvedVideo) -> Vec<(&str, &Itag)> {
        resolved
            .formats
            .iter()
            .map(|f| (f.quality.as_str(), &f.itag))
            .collect()
    }

    enum Answer {
        Video(Video),
        Fail,
        Hang,
    }

    struct StubProvider(Answer);

    #[async_trait]
    impl MetadataProvider for StubProvider {
        async fn resolve(&self, _url: &str) -> std::result::Result<Video, ProviderError> {
            match &self.0 {
                Answer::Video(video) => Ok(video.clone()),
                Answer::Fail => Err(ProviderError::Command {
                    code: 1,
                    output: "ERROR: Video unavailable".to_string(),
                }),
                Answer::Hang => std::future::pending().await,
            }
        }

        async fn fetch_stream(
            &self,
            _url: &str,
            _selector: StreamSelector<'_>,
            _destination: &Path,
        ) -> std::result::Result<u64, ProviderError> {
            unreachable!("the resolver never downloads")
        }
    }

    fn resolver(answer: Answer) -> FormatResolver {
        FormatResolver::new(
            Arc::new(StubProvider(answer)),
            QualityTiers::default(),
            Duration::from_millis(50),
        )
    }

    #[test]
    fn first_listed_match_fills_a_tier() {
        let video = video(serde_json::json!([
            {"format_id": "243", "ext": "webm", "vcodec": "vp9", "acodec": "none"},
            {"format_id": "18", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a.40.2"},
            {"format_id": "136", "ext": "mp4", "vcodec": "avc1", "acodec": "none"},
            {"format_id": "22", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a.40.2"},
        ]));

        let resolved = project(&video, &QualityTiers::default());

        assert_eq!(
            qualities(&resolved),
            vec![("360p", &Itag::Numeric(243)), ("720p", &Itag::Numeric(136))]
        );
        assert_eq!(resolved.formats[0].container, "webm");
    }

    #[test]
    fn unmatched_tiers_are_omitted() {
        let video = video(serde_json::json!([
            {"format_id": "137", "ext": "mp4", "vcodec": "avc1", "acodec": "none"},
            {"format_id": "313", "ext": "webm", "vcodec": "vp9", "acodec": "none"},
        ]));

        let resolved = project(&video, &QualityTiers::default());

        assert_eq!(qualities(&resolved), vec![("1080p", &Itag::Numeric(137))]);
    }

    #[test]
    fn audio_entry_has_the_highest_bitrate() {
        let video = video(serde_json::json!([
            {"format_id": "249", "ext": "webm", "vcodec": "none", "acodec": "opus", "abr": 96.0},
            {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2", "abr": 128.0},
            {"format_id": "18", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a.40.2", "abr": 160.0},
        ]));

        let resolved = project(&video, &QualityTiers::default());
        let audio = resolved.formats.last().unwrap();

        assert_eq!(audio.quality, AUDIO_LABEL);
        assert_eq!(audio.itag, Itag::Numeric(140));
        assert_eq!(audio.container, "m4a");
    }

    #[test]
    fn descriptive_metadata_is_copied() {
        let resolved = project(&video(serde_json::json!([])), &QualityTiers::default());

        assert_eq!(resolved.title, "Never Gonna Give You Up");
        assert_eq!(resolved.author, "Rick Astley");
        assert_eq!(resolved.description, "");
        assert_eq!(resolved.date, "20091025");
        assert_eq!(resolved.thumbnails[0].width, 1280);
        assert!(resolved.formats.is_empty());
    }

    #[test]
    fn custom_tiers_are_honored() {
        let tiers = QualityTiers::new(vec![QualityTier::new("4k", &["313", "401"])]).unwrap();
        let video = video(serde_json::json!([
            {"format_id": "22", "ext": "mp4"},
            {"format_id": "401", "ext": "mp4", "vcodec": "av01", "acodec": "none"},
        ]));

        let resolved = project(&video, &tiers);

        assert_eq!(qualities(&resolved), vec![("4k", &Itag::Numeric(401))]);
    }

    #[test]
    fn invalid_tier_tables_are_rejected() {
        let duplicated = vec![
            QualityTier::new("720p", &["22"]),
            QualityTier::new("720p", &["136"]),
        ];

        assert!(QualityTiers::new(duplicated).is_err());
        assert!(QualityTiers::new(vec![QualityTier::new("720p", &[])]).is_err());
        assert!(QualityTiers::new(vec![QualityTier::new(AUDIO_LABEL, &["140"])]).is_err());
    }

    #[test]
    fn itags_serialize_as_numbers_when_numeric() {
        assert_eq!(serde_json::to_value(Itag::from("22")).unwrap(), serde_json::json!(22));
        assert_eq!(
            serde_json::to_value(Itag::from("251-drc")).unwrap(),
            serde_json::json!("251-drc")
        );
        assert_eq!(Itag::from("022"), Itag::Text("022".to_string()));
    }

    #[test]
    fn choices_serialize_with_type_key() {
        let choice = FormatChoice {
            quality: "720p".to_string(),
            itag: Itag::Numeric(22),
            container: "mp4".to_string(),
        };

        assert_eq!(
            serde_json::to_value(choice).unwrap(),
            serde_json::json!({"quality": "720p", "itag": 22, "type": "mp4"})
        );
    }

    #[tokio::test]
    async fn resolve_rejects_empty_titles() {
        let mut untitled = video(serde_json::json!([]));
        untitled.title.clear();

        let err = resolver(Answer::Video(untitled))
            .resolve("https://youtu.be/x")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EmptyMetadata));
    }

    #[tokio::test]
    async fn resolve_accepts_any_non_empty_title() {
        let mut blank = video(serde_json::json!([]));
        blank.title = " ".to_string();

        assert!(resolver(Answer::Video(blank)).resolve("u").await.is_ok());
    }

    #[tokio::test]
    async fn resolve_wraps_provider_failures() {
        let err = resolver(Answer::Fail).resolve("u").await.unwrap_err();

        assert!(matches!(err, Error::MetadataFetch(_)));
        assert!(err.details().unwrap().contains("Video unavailable"));
    }

    #[tokio::test]
    async fn resolve_times_out() {
        let err = resolver(Answer::Hang).resolve("u").await.unwrap_err();

        assert!(matches!(
            err,
            Error::MetadataFetch(ProviderError::Timeout(_))
        ));
    }
}
