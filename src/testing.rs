//! Recording fakes of the provider and the merge tool.

use crate::provider::{MediaMerger, MetadataProvider, StreamSelector};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use ytdlp_bridge::error::Error as ProviderError;
use ytdlp_bridge::model::Video;

pub(crate) fn video(title: &str, formats: serde_json::Value) -> Video {
    serde_json::from_value(serde_json::json!({
        "id": "dQw4w9WgXcQ",
        "title": title,
        "uploader": "Rick Astley",
        "formats": formats,
    }))
    .unwrap()
}

/// Formats 22 (muxed), 137 (video only) and 140 (audio only).
pub(crate) fn clip() -> Video {
    video(
        "My/Video:Clip*1",
        serde_json::json!([
            {"format_id": "22", "ext": "mp4", "vcodec": "h264", "acodec": "aac"},
            {"format_id": "137", "ext": "mp4", "vcodec": "h264", "acodec": "none"},
            {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "aac", "abr": 128.0},
        ]),
    )
}

fn failure(output: &str) -> ProviderError {
    ProviderError::Command {
        code: 1,
        output: output.to_string(),
    }
}

pub(crate) struct FakeProvider {
    video: Option<Video>,
    fail_audio: bool,
    hang: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub(crate) fn new(video: Video) -> Self {
        Self {
            video: Some(video),
            fail_audio: false,
            hang: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn unavailable() -> Self {
        Self {
            video: None,
            fail_audio: false,
            hang: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_audio(mut self) -> Self {
        self.fail_audio = true;
        self
    }

    /// Writes the first stream, then never finishes it.
    pub(crate) fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    /// The streams fetched so far: `format:<id>` or `bestaudio`.
    pub(crate) fn fetches(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataProvider for FakeProvider {
    async fn resolve(&self, _url: &str) -> Result<Video, ProviderError> {
        self.video
            .clone()
            .ok_or_else(|| failure("ERROR: Video unavailable"))
    }

    async fn fetch_stream(
        &self,
        _url: &str,
        selector: StreamSelector<'_>,
        destination: &Path,
    ) -> Result<u64, ProviderError> {
        let content = match selector {
            StreamSelector::Format(id) => format!("format:{id}"),
            StreamSelector::BestAudio => "bestaudio".to_string(),
        };
        self.calls.lock().unwrap().push(content.clone());

        if self.fail_audio && selector == StreamSelector::BestAudio {
            return Err(failure("ERROR: Requested format is not available"));
        }

        tokio::fs::write(destination, &content).await?;
        if self.hang {
            std::future::pending::<()>().await;
        }
        Ok(content.len() as u64)
    }
}

#[derive(Default)]
pub(crate) struct FakeMerger {
    fail: bool,
    calls: Mutex<Vec<(PathBuf, PathBuf, PathBuf)>>,
}

impl FakeMerger {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn merges(&self) -> Vec<(PathBuf, PathBuf, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaMerger for FakeMerger {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push((
            video.to_path_buf(),
            audio.to_path_buf(),
            output.to_path_buf(),
        ));

        if self.fail {
            return Err(failure("Invalid data found when processing input"));
        }

        let video = tokio::fs::read_to_string(video).await?;
        let audio = tokio::fs::read_to_string(audio).await?;
        tokio::fs::write(output, format!("{video}+{audio}")).await?;
        Ok(())
    }
}

/// The number of entries left in `dir`.
pub(crate) fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
