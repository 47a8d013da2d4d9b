//! An async bridge to the 'yt-dlp' and 'ffmpeg' executables.
//!
//! 'yt-dlp' resolves a video page into its metadata and formats, and streams the bytes of a
//! selected format. 'ffmpeg' merges a video-only stream and an audio-only stream into a
//! single playable file.

use crate::error::Result;
use crate::executor::Executor;
use crate::fetcher::deps::Libraries;
use crate::utils::file_system;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod error;
pub mod executor;
pub mod fetcher;
pub mod model;
pub mod utils;

/// A video fetcher that uses yt-dlp to fetch video information and streams, and ffmpeg to
/// merge them.
///
/// The major implementations of this struct are located in the 'fetcher' module.
///
/// # Examples
///
/// ```rust, no_run
/// # use ytdlp_bridge::Youtube;
/// # use std::path::PathBuf;
/// # use ytdlp_bridge::fetcher::deps::Libraries;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let libraries_dir = PathBuf::from("libs");
///
/// let youtube = libraries_dir.join("yt-dlp");
/// let ffmpeg = libraries_dir.join("ffmpeg");
///
/// let libraries = Libraries::new(youtube, ffmpeg);
/// let fetcher = Youtube::new(libraries);
///
/// let video = fetcher.fetch_video_infos("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await?;
/// println!("Video title: {}", video.title);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Youtube {
    /// The required libraries.
    pub libraries: Libraries,

    /// The arguments to pass to 'yt-dlp', before any other argument.
    pub args: Vec<String>,
    /// The cookies file handed to 'yt-dlp', used only when the file exists.
    pub cookies: Option<PathBuf>,
    /// The timeout for fetching video information.
    pub timeout: Duration,
    /// The timeout for downloading a stream, `None` for no limit.
    pub download_timeout: Option<Duration>,
    /// The timeout for merging, `None` for no limit.
    pub merge_timeout: Option<Duration>,
}

impl fmt::Display for Youtube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Youtube: libraries={}, args={:?}, cookies={:?}",
            self.libraries, self.args, self.cookies
        )
    }
}

impl Youtube {
    /// The 'yt-dlp' selector of the best audio-only stream, as ranked by 'yt-dlp' itself.
    pub const BEST_AUDIO: &'static str = "bestaudio";

    /// Creates a new fetcher with the given yt-dlp and ffmpeg executables.
    ///
    /// Video information must be fetched within 30 seconds; downloads and merges are unbounded.
    pub fn new(libraries: Libraries) -> Self {
        #[cfg(feature = "tracing")]
        tracing::debug!("Creating a new video fetcher with {}", libraries);

        Self {
            libraries,
            args: Vec::new(),
            cookies: None,
            timeout: Duration::from_secs(30),
            download_timeout: None,
            merge_timeout: None,
        }
    }

    /// Sets the arguments to pass to yt-dlp.
    ///
    /// # Arguments
    ///
    /// * `args` - The arguments to pass to yt-dlp.
    pub fn with_args(&mut self, mut args: Vec<String>) -> &mut Self {
        self.args.append(&mut args);
        self
    }

    /// Adds an argument to pass to yt-dlp.
    ///
    /// # Arguments
    ///
    /// * `arg` - The argument to pass to yt-dlp.
    pub fn with_arg(&mut self, arg: impl AsRef<str>) -> &mut Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Sets the cookies file to authenticate yt-dlp with.
    ///
    /// # Arguments
    ///
    /// * `cookies` - A Netscape-format cookies file.
    pub fn with_cookies(&mut self, cookies: impl AsRef<Path>) -> &mut Self {
        self.cookies = Some(cookies.as_ref().to_path_buf());
        self
    }

    /// Sets the timeout for fetching video information.
    ///
    /// # Arguments
    ///
    /// * `timeout` - The timeout duration for fetching video information.
    pub fn with_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// Sets the timeout for downloading one stream.
    ///
    /// # Arguments
    ///
    /// * `timeout` - The timeout, `None` to wait for as long as the download takes.
    pub fn with_download_timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
        self.download_timeout = timeout;
        self
    }

    /// Sets the timeout for merging audio and video.
    ///
    /// # Arguments
    ///
    /// * `timeout` - The timeout, `None` to wait for as long as the merge takes.
    pub fn with_merge_timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
        self.merge_timeout = timeout;
        self
    }

    /// Combines a video-only file and an audio-only file into a single file.
    /// The video stream is copied as is, the audio is encoded to AAC, and the output is
    /// prepared for progressive playback.
    /// Be careful, this function may take a while to execute.
    ///
    /// # Arguments
    ///
    /// * `video_path` - The video-only file.
    /// * `audio_path` - The audio-only file.
    /// * `output_path` - The file to write, overwritten if it exists.
    ///
    /// # Errors
    ///
    /// This function will return an error if ffmpeg could not be started, or if it exited with
    /// a non-zero code. The error carries the output of ffmpeg.
    ///
    /// # Examples
    ///
    /// ```rust, no_run
    /// # use ytdlp_bridge::Youtube;
    /// # use std::path::PathBuf;
    /// # use ytdlp_bridge::fetcher::deps::Libraries;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let libraries = Libraries::new(PathBuf::from("yt-dlp"), PathBuf::from("ffmpeg"));
    /// let fetcher = Youtube::new(libraries);
    ///
    /// let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
    /// fetcher.download_format(url, "137", "video-stream.mp4").await?;
    /// fetcher.download_format(url, Youtube::BEST_AUDIO, "audio-stream.m4a").await?;
    ///
    /// fetcher.combine_audio_and_video("video-stream.mp4", "audio-stream.m4a", "my-output.mp4").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn combine_audio_and_video(
        &self,
        video_path: impl AsRef<Path>,
        audio_path: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
    ) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Combining video and audio files {:?} and {:?}, into {:?}",
            video_path.as_ref(),
            audio_path.as_ref(),
            output_path.as_ref()
        );

        let args = merge_args(video_path.as_ref(), audio_path.as_ref(), output_path.as_ref())?;

        let executor = Executor {
            executable_path: self.libraries.ffmpeg.clone(),
            timeout: self.merge_timeout,
            args,
        };

        executor.execute().await?;
        Ok(())
    }

    /// The arguments shared by every 'yt-dlp' invocation.
    fn base_args(&self) -> Vec<String> {
        let mut args = self.args.clone();

        if let Some(cookies) = &self.cookies {
            if cookies.is_file() {
                args.push("--cookies".to_string());
                args.push(cookies.to_string_lossy().into_owned());
            } else {
                #[cfg(feature = "tracing")]
                tracing::debug!("Cookies file {:?} not found, fetching without it", cookies);
            }
        }

        args
    }
}

/// The 'ffmpeg' arguments merging a video-only and an audio-only file.
fn merge_args(video_path: &Path, audio_path: &Path, output_path: &Path) -> Result<Vec<String>> {
    let video = file_system::try_str(video_path)?;
    let audio = file_system::try_str(audio_path)?;
    let output = file_system::try_str(output_path)?;

    Ok(utils::to_owned(vec![
        "-y",
        "-i",
        video,
        "-i",
        audio,
        "-c:v",
        "copy",
        "-c:a",
        "aac",
        "-movflags",
        "+faststart",
        output,
    ]))
}
