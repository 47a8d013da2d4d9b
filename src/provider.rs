//! The external collaborators: the metadata provider and the merge tool.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use ytdlp_bridge::Youtube;
use ytdlp_bridge::error::Error as ProviderError;
use ytdlp_bridge::model::Video;

/// Which stream to fetch from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSelector<'a> {
    /// The format with exactly this ID.
    Format(&'a str),
    /// The provider's own choice of best audio-only stream.
    BestAudio,
}

impl fmt::Display for StreamSelector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamSelector::Format(id) => write!(f, "format {id}"),
            StreamSelector::BestAudio => write!(f, "best audio"),
        }
    }
}

/// Resolves video pages into metadata and fetches their streams.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetches the title, formats and descriptive metadata of the video at `url`.
    async fn resolve(&self, url: &str) -> Result<Video, ProviderError>;

    /// Writes the selected stream of the video at `url` to `destination`.
    /// Returns the number of bytes written.
    async fn fetch_stream(
        &self,
        url: &str,
        selector: StreamSelector<'_>,
        destination: &Path,
    ) -> Result<u64, ProviderError>;
}

/// Combines a video-only file and an audio-only file into one container.
#[async_trait]
pub trait MediaMerger: Send + Sync {
    /// Writes the merge of `video` and `audio` to `output`.
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), ProviderError>;
}

#[async_trait]
impl MetadataProvider for Youtube {
    async fn resolve(&self, url: &str) -> Result<Video, ProviderError> {
        self.fetch_video_infos(url).await
    }

    async fn fetch_stream(
        &self,
        url: &str,
        selector: StreamSelector<'_>,
        destination: &Path,
    ) -> Result<u64, ProviderError> {
        let selector = match selector {
            StreamSelector::Format(id) => id,
            StreamSelector::BestAudio => Youtube::BEST_AUDIO,
        };

        self.download_format(url, selector, destination).await
    }
}

#[async_trait]
impl MediaMerger for Youtube {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), ProviderError> {
        self.combine_audio_and_video(video, audio, output).await
    }
}
