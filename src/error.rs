//! The errors of the format resolver and the download pipeline.

use std::fmt;
use thiserror::Error;
use ytdlp_bridge::error::Error as ProviderError;

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Which of the two streams of a download failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Video => write!(f, "video"),
            StreamKind::Audio => write!(f, "audio"),
        }
    }
}

/// The possible errors of a request.
///
/// Everything but [`Error::StreamWrite`] happens before the response headers are sent.
#[derive(Debug, Error)]
pub enum Error {
    /// A query parameter is missing or malformed.
    #[error("{0}")]
    InvalidRequest(String),
    /// The metadata provider could not resolve the URL.
    #[error("failed to fetch video info")]
    MetadataFetch(#[source] ProviderError),
    /// The metadata provider answered without a usable title.
    #[error("failed to fetch video metadata")]
    EmptyMetadata,
    /// The requested format is not in the current format list.
    #[error("invalid format or itag")]
    FormatNotFound { format_id: String },
    /// The per-request temporary storage could not be set up.
    #[error("failed to create temp file")]
    TempStorage(#[source] std::io::Error),
    /// A stream could not be downloaded to temporary storage.
    #[error("failed to download {kind}")]
    StreamDownload {
        kind: StreamKind,
        #[source]
        source: ProviderError,
    },
    /// The merge tool failed.
    #[error("failed to merge video and audio")]
    Merge(#[source] ProviderError),
    /// The final file could not be opened for streaming.
    #[error("failed to open output file")]
    OpenOutput(#[source] std::io::Error),
    /// The final file could not be read while streaming; headers are already sent.
    #[error("failed to stream file")]
    StreamWrite(#[source] std::io::Error),
    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Returns true for errors caused by the request rather than by the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidRequest(_) | Error::FormatNotFound { .. }
        )
    }

    /// Returns the diagnostic detail worth showing next to the summary, if any.
    /// For merge failures this is the output of the merge tool.
    pub fn details(&self) -> Option<String> {
        match self {
            Error::MetadataFetch(source) | Error::StreamDownload { source, .. } => {
                Some(source.to_string())
            }
            Error::Merge(source) => Some(
                source
                    .process_output()
                    .map(str::to_string)
                    .unwrap_or_else(|| source.to_string()),
            ),
            Error::TempStorage(source)
            | Error::OpenOutput(source)
            | Error::StreamWrite(source) => Some(source.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors() {
        assert!(Error::InvalidRequest("missing url".into()).is_client_error());
        assert!(
            Error::FormatNotFound {
                format_id: "999".into()
            }
            .is_client_error()
        );
        assert!(!Error::EmptyMetadata.is_client_error());
    }

    #[test]
    fn merge_details_carry_tool_output() {
        let err = Error::Merge(ProviderError::Command {
            code: 1,
            output: "Invalid data found when processing input".into(),
        });

        assert_eq!(err.to_string(), "failed to merge video and audio");
        assert_eq!(
            err.details().as_deref(),
            Some("Invalid data found when processing input")
        );
    }

    #[test]
    fn stream_errors_name_the_stream() {
        let err = Error::StreamDownload {
            kind: StreamKind::Audio,
            source: ProviderError::Timeout(std::time::Duration::from_secs(1)),
        };

        assert_eq!(err.to_string(), "failed to download audio");
    }
}
