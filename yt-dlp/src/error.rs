//! The errors that can occur.

use std::time::Duration;
use thiserror::Error;

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The possible errors that can occur.
#[derive(Debug, Error)]
pub enum Error {
    /// An error occurred while running the runtime.
    #[error("An error occurred while running the runtime: {0}")]
    Runtime(#[from] tokio::task::JoinError),
    /// An error occurred while interacting with the file system.
    #[error("An IO error occurred: {0}")]
    IO(#[from] std::io::Error),
    /// An error occurred while parsing JSON.
    #[error("An error occurred while parsing JSON: {0}")]
    Serde(#[from] serde_json::Error),

    /// The executable could not be started at all.
    #[error("Failed to spawn {executable}: {source}")]
    Spawn {
        /// The executable that was being started.
        executable: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// An error occurred while running a command.
    #[error("Process failed with code {code}: {output}")]
    Command {
        /// The exit code of the process, `-1` when killed by a signal.
        code: i32,
        /// The combined stdout and stderr of the process.
        output: String,
    },
    /// An error occurred manipulating a path.
    #[error("An invalid path was provided: {0}")]
    Path(String),
    /// An error occurred due to a timeout.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    /// No executable was found for the given name.
    #[error("No {0} executable found in PATH")]
    Binary(String),
}

impl Error {
    /// Returns the diagnostic output of a failed process, if any.
    pub fn process_output(&self) -> Option<&str> {
        match self {
            Error::Command { output, .. } => Some(output),
            _ => None,
        }
    }
}
