//! Tools for fetching data through 'yt-dlp'.
//!
//! This module is subdivided into several modules, each responsible for one side of the fetching:
//! locating the required executables, and fetching video information and streams.

pub mod deps;
pub mod streams;
