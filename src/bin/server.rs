use chadloader::api::{ApiServer, AppState};
use chadloader::config::{Cli, Settings};
use chadloader::formats::FormatResolver;
use chadloader::pipeline::DownloadPipeline;
use clap::Parser;
use log::{error, info};
use std::sync::Arc;
use ytdlp_bridge::Youtube;
use ytdlp_bridge::fetcher::deps::Libraries;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = Settings::load(Cli::parse())?;

    env_logger::Builder::new()
        .filter_level(settings.verbosity)
        .parse_default_env()
        .init();

    info!("Starting ChadLoader Server...");

    let libraries = Libraries::locate(settings.yt_dlp.clone(), settings.ffmpeg.clone())?;
    info!("Using {}", libraries);

    let mut youtube = Youtube::new(libraries);
    youtube
        .with_cookies(&settings.cookies)
        .with_timeout(settings.metadata_timeout)
        .with_download_timeout(settings.download_timeout)
        .with_merge_timeout(settings.merge_timeout);
    if !settings.cookies.is_file() {
        info!(
            "No cookies file at {}, fetching without cookies",
            settings.cookies.display()
        );
    }

    let youtube = Arc::new(youtube);
    let state = AppState {
        resolver: FormatResolver::new(
            youtube.clone(),
            settings.tiers.clone(),
            settings.metadata_timeout,
        ),
        pipeline: DownloadPipeline::new(
            youtube.clone(),
            youtube,
            settings.temp_dir.clone(),
            settings.metadata_timeout,
        )
        .with_stall_timeout(settings.stall_timeout),
    };

    let server = ApiServer::new(settings.server.clone(), state);
    let cancel_token = server.cancel_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C");
                cancel_token.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    server.run().await?;
    Ok(())
}
