//! The download pipeline: fetch the selected stream, merge it with the best audio when it has
//! none, and stream the result, removing every temporary file on the way out.
//!
//! Each request works in its own temporary directory, owned by a [`DownloadJob`]. The job is
//! cleaned up when it's dropped, so every early return, error and client disconnect releases
//! the files. Once the download is prepared, the job moves into the [`DownloadStream`] and
//! lives until the last byte is sent, or until the client stops reading for longer than the
//! stall timeout.

use crate::error::{Error, Result, StreamKind};
use crate::filename::sanitize_filename;
use crate::formats::fetch_metadata;
use crate::provider::{MediaMerger, MetadataProvider, StreamSelector};
use axum::body::Bytes;
use futures_util::Stream;
use log::{debug, error, info, warn};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tempfile::TempDir;
use tokio::fs::File;
use tokio::io::AsyncRead;
use tokio::sync::Notify;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use ytdlp_bridge::model::format::Format;

/// The prefix of the per-request temporary directories.
const JOB_DIR_PREFIX: &str = "chadloader-";

/// The steps of one download.
///
/// A job exists once the metadata is fetched and the format matched, so it starts at
/// [`Stage::FormatMatched`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FormatMatched,
    VideoDownloaded,
    AudioDownloaded,
    Merged,
    Streaming,
    Cleaned,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::FormatMatched => "format matched",
            Stage::VideoDownloaded => "video downloaded",
            Stage::AudioDownloaded => "audio downloaded",
            Stage::Merged => "merged",
            Stage::Streaming => "streaming",
            Stage::Cleaned => "cleaned",
        };
        write!(f, "{name}")
    }
}

/// The working state of one download, and the owner of its temporary files.
#[derive(Debug)]
pub struct DownloadJob {
    dir: Option<TempDir>,
    format: Format,
    video_path: PathBuf,
    audio_path: PathBuf,
    output_path: PathBuf,
    needs_merge: bool,
    stage: Stage,
}

impl DownloadJob {
    /// Creates a fresh directory under `temp_root` for downloading `format`.
    pub async fn create(temp_root: &Path, format: Format) -> Result<Self> {
        tokio::fs::create_dir_all(temp_root)
            .await
            .map_err(Error::TempStorage)?;

        let root = temp_root.to_path_buf();
        let dir = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix(JOB_DIR_PREFIX)
                .tempdir_in(root)
        })
        .await
        .map_err(|e| Error::TempStorage(io::Error::other(e)))?
        .map_err(Error::TempStorage)?;

        let extension: String = format
            .ext
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        let video_path = dir.path().join("video").with_extension(extension);
        let audio_path = dir.path().join("audio.m4a");
        let needs_merge = format.lacks_audio();
        let output_path = if needs_merge {
            dir.path().join("final.mp4")
        } else {
            video_path.clone()
        };

        debug!(
            "Created download job in {:?} for format {} (merge: {})",
            dir.path(),
            format.format_id,
            needs_merge
        );

        Ok(Self {
            dir: Some(dir),
            format,
            video_path,
            audio_path,
            output_path,
            needs_merge,
            stage: Stage::FormatMatched,
        })
    }

    pub fn format(&self) -> &Format {
        &self.format
    }

    pub fn video_path(&self) -> &Path {
        &self.video_path
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    /// The file that's streamed to the client: the merge output, or the video itself.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn needs_merge(&self) -> bool {
        self.needs_merge
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, stage: Stage) {
        debug!("Download of format {}: {}", self.format.format_id, stage);
        self.stage = stage;
    }

    /// Removes the temporary files and their directory. Failures are logged, and calling it
    /// again does nothing.
    pub fn cleanup(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        // Blocking removals: this also runs from `Drop`.
        remove_if_present(&self.video_path);
        remove_if_present(&self.audio_path);
        if self.output_path != self.video_path {
            remove_if_present(&self.output_path);
        }

        let path = dir.path().to_path_buf();
        if let Err(e) = dir.close() {
            warn!("Failed to remove temporary directory {:?}: {}", path, e);
        }

        self.advance(Stage::Cleaned);
    }
}

impl Drop for DownloadJob {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn remove_if_present(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed {:?}", path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove temporary file {:?}: {}", path, e),
    }
}

/// A download ready to be sent: every step that can fail with a status code is done.
#[derive(Debug)]
pub struct PreparedDownload {
    /// The sanitized title, without extension.
    pub file_name: String,
    /// The size of the file to send.
    pub content_length: u64,
    // Declared before the job so that the file is closed before its removal.
    file: File,
    job: DownloadJob,
    stall_timeout: Option<Duration>,
}

impl PreparedDownload {
    pub fn job(&self) -> &DownloadJob {
        &self.job
    }

    /// Turns the download into a body stream; the job is cleaned up once it ends or is dropped.
    pub fn into_stream(self) -> DownloadStream {
        let PreparedDownload {
            file,
            mut job,
            stall_timeout,
            ..
        } = self;

        info!("Streaming final file to client: {:?}", job.output_path());
        job.advance(Stage::Streaming);

        DownloadStream::new(file, job, stall_timeout)
    }
}

fn lock(job: &Mutex<DownloadJob>) -> MutexGuard<'_, DownloadJob> {
    job.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cleans up a job whose client hasn't asked for a chunk within the timeout.
#[derive(Debug)]
struct StallWatch {
    progress: Arc<Notify>,
    stalled: Arc<AtomicBool>,
    done: CancellationToken,
}

impl StallWatch {
    fn spawn(job: Arc<Mutex<DownloadJob>>, timeout: Duration) -> Self {
        let watch = Self {
            progress: Arc::new(Notify::new()),
            stalled: Arc::new(AtomicBool::new(false)),
            done: CancellationToken::new(),
        };

        let progress = watch.progress.clone();
        let stalled = watch.stalled.clone();
        let done = watch.done.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = done.cancelled() => return,
                    sent = tokio::time::timeout(timeout, progress.notified()) => {
                        if sent.is_err() {
                            warn!("Client stopped reading for {:?}, dropping download", timeout);
                            stalled.store(true, Ordering::Release);
                            lock(&job).cleanup();
                            return;
                        }
                    }
                }
            }
        });

        watch
    }

    fn stalled(&self) -> bool {
        self.stalled.load(Ordering::Acquire)
    }
}

/// The bytes of the final file.
#[derive(Debug)]
pub struct DownloadStream<R = File> {
    reader: Option<ReaderStream<R>>,
    job: Arc<Mutex<DownloadJob>>,
    watch: Option<StallWatch>,
    sent: u64,
}

impl<R: AsyncRead + Unpin> DownloadStream<R> {
    /// Streams `reader`, which reads the output of `job`. Without a chunk requested for
    /// `stall_timeout`, the job is cleaned up and the stream fails.
    pub(crate) fn new(reader: R, job: DownloadJob, stall_timeout: Option<Duration>) -> Self {
        let job = Arc::new(Mutex::new(job));
        let watch = stall_timeout.map(|timeout| StallWatch::spawn(job.clone(), timeout));

        Self {
            reader: Some(ReaderStream::new(reader)),
            job,
            watch,
            sent: 0,
        }
    }
}

impl<R> DownloadStream<R> {
    pub fn output_path(&self) -> PathBuf {
        lock(&self.job).output_path().to_path_buf()
    }

    pub fn stage(&self) -> Stage {
        lock(&self.job).stage()
    }

    fn finish(&mut self) {
        self.reader = None;
        if let Some(watch) = &self.watch {
            watch.done.cancel();
        }
        lock(&self.job).cleanup();
    }
}

impl<R: AsyncRead + Unpin> Stream for DownloadStream<R> {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.reader.is_none() {
            return Poll::Ready(None);
        }

        if this.watch.as_ref().is_some_and(StallWatch::stalled) {
            this.finish();
            return Poll::Ready(Some(Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "client stopped reading",
            ))));
        }

        let Some(reader) = this.reader.as_mut() else {
            return Poll::Ready(None);
        };
        match Pin::new(reader).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.sent += chunk.len() as u64;
                if let Some(watch) = &this.watch {
                    watch.progress.notify_one();
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                let err = Error::StreamWrite(e);
                error!(
                    "{} {:?} after {} bytes: {}",
                    err,
                    lock(&this.job).output_path(),
                    this.sent,
                    err.details().unwrap_or_default()
                );
                this.finish();
                Poll::Ready(Some(Err(io::Error::other(err))))
            }
            Poll::Ready(None) => {
                info!("Download completed after {} bytes", this.sent);
                this.finish();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<R> Drop for DownloadStream<R> {
    fn drop(&mut self) {
        if self.reader.is_some() {
            warn!("Client went away after {} bytes", self.sent);
        }
        self.finish();
    }
}

/// Downloads, merges and hands out the requested formats.
#[derive(Clone)]
pub struct DownloadPipeline {
    provider: Arc<dyn MetadataProvider>,
    merger: Arc<dyn MediaMerger>,
    temp_root: PathBuf,
    metadata_timeout: Duration,
    stall_timeout: Option<Duration>,
}

impl DownloadPipeline {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        merger: Arc<dyn MediaMerger>,
        temp_root: PathBuf,
        metadata_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            merger,
            temp_root,
            metadata_timeout,
            stall_timeout: None,
        }
    }

    /// Drops a download whose client stops reading for `timeout`. `None` never does.
    pub fn with_stall_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stall_timeout = timeout;
        self
    }

    /// Runs every step up to the opening of the final file.
    ///
    /// The metadata is fetched again rather than trusted from an earlier resolve, since format
    /// IDs aren't stable over time.
    ///
    /// # Errors
    ///
    /// Any failing step ends the download and removes what was written so far. A `format_id`
    /// that the video doesn't list fails with [`Error::FormatNotFound`] before any stream is
    /// fetched.
    pub async fn prepare(&self, url: &str, format_id: &str) -> Result<PreparedDownload> {
        let video = fetch_metadata(self.provider.as_ref(), url, self.metadata_timeout).await?;
        info!("Got video: {}", video.title);

        let Some(format) = video.format(format_id).cloned() else {
            warn!(
                "Invalid itag: {} (available IDs: {:?})",
                format_id,
                video.format_ids()
            );
            return Err(Error::FormatNotFound {
                format_id: format_id.to_string(),
            });
        };

        let file_name = sanitize_filename(&video.title);
        let mut job = DownloadJob::create(&self.temp_root, format).await?;

        info!(
            "Downloading format {} ({} {})",
            job.format().format_id,
            job.format().vcodec.as_deref().unwrap_or("?"),
            job.format().resolution.as_deref().unwrap_or("?")
        );
        self.provider
            .fetch_stream(url, StreamSelector::Format(format_id), job.video_path())
            .await
            .map_err(|source| Error::StreamDownload {
                kind: StreamKind::Video,
                source,
            })?;
        job.advance(Stage::VideoDownloaded);

        if job.needs_merge() {
            info!("No audio in this stream, downloading best audio...");
            self.provider
                .fetch_stream(url, StreamSelector::BestAudio, job.audio_path())
                .await
                .map_err(|source| Error::StreamDownload {
                    kind: StreamKind::Audio,
                    source,
                })?;
            job.advance(Stage::AudioDownloaded);

            info!("Merging video and audio...");
            self.merger
                .merge(job.video_path(), job.audio_path(), job.output_path())
                .await
                .map_err(Error::Merge)?;
            job.advance(Stage::Merged);
        } else {
            info!("Stream includes audio, skipping merge.");
        }

        let file = File::open(job.output_path())
            .await
            .map_err(Error::OpenOutput)?;
        let content_length = file.metadata().await.map_err(Error::OpenOutput)?.len();

        Ok(PreparedDownload {
            file_name,
            content_length,
            file,
            job,
            stall_timeout: self.stall_timeout,
        })
    }
}
