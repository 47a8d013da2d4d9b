//! A tool for executing commands.

use crate::error::{Error, Result};
use crate::utils::file_system;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};

/// Represents a command executor.
///
/// # Example
///
/// ```rust,no_run
/// # use ytdlp_bridge::utils;
/// # use std::path::PathBuf;
/// # use std::time::Duration;
/// # use ytdlp_bridge::executor::Executor;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let args = vec!["--version"];
///
/// let executor = Executor {
///     executable_path: PathBuf::from("yt-dlp"),
///     timeout: Some(Duration::from_secs(30)),
///     args: utils::to_owned(args),
/// };
///
/// let output = executor.execute().await?;
/// println!("Output: {}", output.stdout);
///
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Executor {
    /// The path to the command executable.
    pub executable_path: PathBuf,
    /// The timeout for the process, `None` to wait for as long as it takes.
    pub timeout: Option<Duration>,

    /// The arguments to pass to the command.
    pub args: Vec<String>,
}

/// Represents the output of a process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutput {
    /// The stdout of the process.
    pub stdout: String,
    /// The stderr of the process.
    pub stderr: String,
    /// The exit code of the process.
    pub code: i32,
}

impl ProcessOutput {
    /// Returns stdout followed by stderr, as a single diagnostic string.
    pub fn combined(&self) -> String {
        combine(&self.stdout, &self.stderr)
    }
}

impl Executor {
    /// Executes the command and returns the output.
    ///
    /// # Errors
    ///
    /// This function will return an error if the command could not be executed, if it exited
    /// with a non-zero code, or if the process timed out.
    pub async fn execute(&self) -> Result<ProcessOutput> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Executing command: {:?}", self);

        let mut child = self.spawn()?;

        // Continually read from stdout so that it does not fill up with large output and hang
        // forever.
        let stdout_handle = child
            .stdout
            .take()
            .ok_or_else(|| Error::Path("Failed to capture stdout".to_string()))?;
        let stderr_handle = child
            .stderr
            .take()
            .ok_or_else(|| Error::Path("Failed to capture stderr".to_string()))?;

        let stdout_task = tokio::spawn(read_to_end(stdout_handle));
        let stderr_task = tokio::spawn(read_to_end(stderr_handle));

        let exit_status = self.wait_with_timeout(&mut child).await?;

        let stdout = String::from_utf8_lossy(&stdout_task.await??).into_owned();
        let stderr = String::from_utf8_lossy(&stderr_task.await??).into_owned();

        let code = exit_status.code().unwrap_or(-1);
        if exit_status.success() {
            return Ok(ProcessOutput {
                stdout,
                stderr,
                code,
            });
        }

        Err(Error::Command {
            code,
            output: combine(&stdout, &stderr),
        })
    }

    /// Executes the command, writing its stdout to the given destination file.
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// This function will return an error if the command could not be executed, if the
    /// destination could not be written, if it exited with a non-zero code, or if the process
    /// timed out. A partially written destination is left for the caller to remove.
    pub async fn execute_to_file(&self, destination: impl AsRef<Path>) -> Result<u64> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Executing command: {:?}, writing stdout to {:?}",
            self,
            destination.as_ref()
        );

        let mut file = file_system::create_file(destination.as_ref()).await?;
        let mut child = self.spawn()?;

        let mut stdout_handle = child
            .stdout
            .take()
            .ok_or_else(|| Error::Path("Failed to capture stdout".to_string()))?;
        let stderr_handle = child
            .stderr
            .take()
            .ok_or_else(|| Error::Path("Failed to capture stderr".to_string()))?;

        let stderr_task = tokio::spawn(read_to_end(stderr_handle));

        let work = async {
            let written = tokio::io::copy(&mut stdout_handle, &mut file).await?;
            file.flush().await?;
            let status = child.wait().await?;
            Ok::<(u64, ExitStatus), Error>((written, status))
        };

        let outcome = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, work).await.ok(),
            None => Some(work.await),
        };

        let Some(result) = outcome else {
            kill(&mut child).await;
            return Err(Error::Timeout(self.timeout.unwrap_or_default()));
        };

        let (written, exit_status) = match result {
            Ok(done) => done,
            Err(e) => {
                kill(&mut child).await;
                return Err(e);
            }
        };

        let stderr = String::from_utf8_lossy(&stderr_task.await??).into_owned();

        if exit_status.success() {
            #[cfg(feature = "tracing")]
            tracing::debug!("Wrote {} bytes to {:?}", written, destination.as_ref());

            return Ok(written);
        }

        Err(Error::Command {
            code: exit_status.code().unwrap_or(-1),
            output: stderr,
        })
    }

    fn spawn(&self) -> Result<Child> {
        let mut command = Command::new(&self.executable_path);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        // Dropping the future (e.g. on client disconnect) must not leave the process running.
        command.kill_on_drop(true);

        #[cfg(target_os = "windows")]
        {
            command.creation_flags(0x08000000);
        }

        command.args(&self.args);
        command.spawn().map_err(|source| Error::Spawn {
            executable: self.executable_path.display().to_string(),
            source,
        })
    }

    async fn wait_with_timeout(&self, child: &mut Child) -> Result<ExitStatus> {
        let Some(timeout) = self.timeout else {
            return Ok(child.wait().await?);
        };

        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Process timed out after {:?}, killing it", timeout);

                kill(child).await;
                Err(Error::Timeout(timeout))
            }
        }
    }
}

async fn kill(child: &mut Child) {
    if let Err(_e) = child.kill().await {
        #[cfg(feature = "tracing")]
        tracing::error!("Failed to kill process: {}", _e);
    }
}

async fn read_to_end(mut handle: impl AsyncRead + Unpin) -> std::io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    handle.read_to_end(&mut buffer).await?;
    Ok(buffer)
}

fn combine(stdout: &str, stderr: &str) -> String {
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (true, _) => stderr.trim().to_string(),
        (false, true) => stdout.trim().to_string(),
        (false, false) => format!("{}\n{}", stdout.trim(), stderr.trim()),
    }
}
