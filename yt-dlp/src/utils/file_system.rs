//! Tools for working with the file system.

use crate::error::{Error, Result};
use std::path::Path;
use tokio::fs::{File, OpenOptions};

/// Returns the path as UTF-8, the form the executables expect it as an argument.
pub fn try_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| Error::Path(format!("{} is not valid UTF-8", path.display())))
}

/// Creates a new file at the given destination, truncating any existing content.
///
/// # Arguments
///
/// * `destination` - The path to create the file at.
pub async fn create_file(destination: impl AsRef<Path>) -> Result<File> {
    let mut open_options = OpenOptions::new();
    open_options.write(true);
    open_options.create(true);
    open_options.truncate(true);

    #[cfg(not(target_os = "windows"))]
    {
        open_options.mode(0o644);
    }

    let file = open_options.open(destination).await?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_file_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        tokio::fs::write(&path, b"previous content").await.unwrap();

        drop(create_file(&path).await.unwrap());

        assert_eq!(tokio::fs::metadata(&path).await.unwrap().len(), 0);
    }
}
