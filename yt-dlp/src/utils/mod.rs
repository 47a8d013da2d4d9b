//! Utility functions and types used throughout the application.

use std::path::PathBuf;

pub mod file_system;

/// Converts a vector of string slices to a vector of owned strings.
pub fn to_owned(vec: Vec<impl AsRef<str>>) -> Vec<String> {
    vec.into_iter().map(|s| s.as_ref().to_string()).collect()
}

/// Returns the platform file name of an executable, e.g. 'ffmpeg.exe' on Windows.
pub fn find_executable(name: impl AsRef<str>) -> String {
    if cfg!(target_os = "windows") {
        format!("{}.exe", name.as_ref())
    } else {
        name.as_ref().to_string()
    }
}

/// Searches the directories of the `PATH` environment variable for the given executable.
pub fn which(name: impl AsRef<str>) -> Option<PathBuf> {
    let executable = find_executable(name);
    let paths = std::env::var_os("PATH")?;

    std::env::split_paths(&paths)
        .map(|dir| dir.join(&executable))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_owned_copies_every_argument() {
        assert_eq!(to_owned(vec!["-i", "a.mp4"]), vec!["-i", "a.mp4"]);
    }

    #[test]
    fn which_misses_unknown_executables() {
        assert_eq!(which("surely-not-an-installed-binary-name"), None);
    }

    #[cfg(unix)]
    #[test]
    fn which_finds_sh() {
        assert!(which("sh").is_some());
    }
}
