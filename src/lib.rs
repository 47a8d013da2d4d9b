//! ChadLoader: an HTTP API that lists the formats of a video and downloads one of them as a
//! single mp4, merging a separate audio stream in when the format has none.
//!
//! [`formats::FormatResolver`] answers the listing, [`pipeline::DownloadPipeline`] the
//! download. Both talk to the outside world through the traits of [`provider`], implemented
//! by [`ytdlp_bridge::Youtube`].

pub mod api;
pub mod config;
pub mod error;
pub mod filename;
pub mod formats;
pub mod pipeline;
pub mod provider;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
