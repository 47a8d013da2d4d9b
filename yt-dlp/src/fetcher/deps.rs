//! The required dependencies, 'yt-dlp' and 'ffmpeg'.

use crate::error::{Error, Result};
use crate::utils;
use derive_more::Constructor;
use std::fmt;
use std::path::PathBuf;

/// The installed libraries.
///
/// # Examples
///
/// ```rust,no_run
/// # use ytdlp_bridge::fetcher::deps::Libraries;
/// # use std::path::PathBuf;
/// let destination = PathBuf::from("libs");
///
/// let youtube = destination.join("yt-dlp");
/// let ffmpeg = destination.join("ffmpeg");
///
/// let libraries = Libraries::new(youtube, ffmpeg);
/// ```
#[derive(Constructor, Clone, Debug, PartialEq, Eq)]
pub struct Libraries {
    /// The path to the yt-dlp binary.
    pub youtube: PathBuf,
    /// The path to the ffmpeg binary.
    pub ffmpeg: PathBuf,
}

impl Libraries {
    /// Resolves both executables, using the given paths when set and searching `PATH` otherwise.
    ///
    /// # Errors
    ///
    /// This function will return an error if an executable was not given and is not in `PATH`.
    pub fn locate(youtube: Option<PathBuf>, ffmpeg: Option<PathBuf>) -> Result<Self> {
        let youtube = match youtube {
            Some(path) => path,
            None => utils::which("yt-dlp").ok_or_else(|| Error::Binary("yt-dlp".to_string()))?,
        };
        let ffmpeg = match ffmpeg {
            Some(path) => path,
            None => utils::which("ffmpeg").ok_or_else(|| Error::Binary("ffmpeg".to_string()))?,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!("Using yt-dlp at {:?} and ffmpeg at {:?}", youtube, ffmpeg);

        Ok(Self::new(youtube, ffmpeg))
    }
}

impl fmt::Display for Libraries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Libraries(youtube={}, ffmpeg={})",
            self.youtube.display(),
            self.ffmpeg.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_paths_are_kept() {
        let libraries = Libraries::locate(
            Some(PathBuf::from("/opt/yt-dlp")),
            Some(PathBuf::from("/opt/ffmpeg")),
        )
        .unwrap();

        assert_eq!(
            libraries,
            Libraries::new(PathBuf::from("/opt/yt-dlp"), PathBuf::from("/opt/ffmpeg"))
        );
    }
}
