//! Tools for fetching video information and streams.

use crate::error::Result;
use crate::executor::Executor;
use crate::model::Video;
use crate::{Youtube, utils};
use std::path::Path;

impl Youtube {
    /// Fetch the video information from the given URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL of the video to fetch.
    ///
    /// # Errors
    ///
    /// This function will return an error if the video information could not be fetched,
    /// including when 'yt-dlp' does not answer within the configured timeout.
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
    /// let video = fetcher.fetch_video_infos("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await?;
    /// println!("Video title: {}", video.title);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fetch_video_infos(&self, url: impl AsRef<str>) -> Result<Video> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Fetching video information for {}", url.as_ref());

        let mut args = self.base_args();
        args.extend(utils::to_owned(vec![
            "--no-progress",
            "--no-playlist",
            "--dump-single-json",
            "--",
            url.as_ref(),
        ]));

        let executor = Executor {
            executable_path: self.libraries.youtube.clone(),
            timeout: Some(self.timeout),
            args,
        };

        let output = executor.execute().await?;
        let video: Video = serde_json::from_str(&output.stdout)?;

        #[cfg(feature = "tracing")]
        tracing::debug!("Fetched {}", video);

        Ok(video)
    }

    /// Downloads the stream selected by `selector` and writes it to `destination`.
    /// Returns the number of bytes written.
    /// Be careful, this function may take a while to execute.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL of the video.
    /// * `selector` - A format ID, or a 'yt-dlp' selector such as [`Youtube::BEST_AUDIO`].
    /// * `destination` - The file to write the stream to.
    ///
    /// # Errors
    ///
    /// This function will return an error if 'yt-dlp' fails, or if the destination can't be
    /// written. A partially written destination is left in place.
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
    /// let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
    ///
    /// fetcher.download_format(url, "137", "video-stream.mp4").await?;
    /// fetcher.download_format(url, Youtube::BEST_AUDIO, "audio-stream.m4a").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn download_format(
        &self,
        url: impl AsRef<str>,
        selector: impl AsRef<str>,
        destination: impl AsRef<Path>,
    ) -> Result<u64> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Downloading format {} of {} to {:?}",
            selector.as_ref(),
            url.as_ref(),
            destination.as_ref()
        );

        let mut args = self.base_args();
        args.extend(utils::to_owned(vec![
            "--no-progress",
            "--no-playlist",
            "--no-part",
            "-f",
            selector.as_ref(),
            "-o",
            "-",
            "--",
            url.as_ref(),
        ]));

        let executor = Executor {
            executable_path: self.libraries.youtube.clone(),
            timeout: self.download_timeout,
            args,
        };

        executor.execute_to_file(destination).await
    }
}
