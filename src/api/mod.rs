//! The HTTP surface.
//!
//! `GET /` answers a liveness message, `GET /api/v1/youtube` resolves a video into its quality
//! tiers, and `GET /api/v1/youtube/download` streams one of its formats as an mp4 attachment.

pub mod error;
pub mod routes;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use routes::{AppState, create_router};
pub use server::{ApiServer, ApiServerConfig};
