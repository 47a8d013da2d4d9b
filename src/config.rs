//! Server settings: command line, environment and an optional TOML file.
//!
//! Flags and their environment variables win over the file, and the file over the defaults.

use crate::api::ApiServerConfig;
use crate::error::{Error, Result};
use crate::formats::QualityTiers;
use clap::Parser;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The cookies file used when none is configured; skipped if it doesn't exist.
pub const DEFAULT_COOKIES: &str = "/app/cookies.txt";

const DEFAULT_METADATA_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STALL_TIMEOUT_SECS: u64 = 60;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "chadloader", version, about)]
pub struct Cli {
    #[arg(long = "port", short, env = "PORT")]
    pub port: Option<u16>,

    #[arg(long = "bind-address")]
    pub bind_address: Option<IpAddr>,

    /// Netscape cookies file handed to yt-dlp.
    #[arg(long = "cookies", env = "COOKIES_FILE")]
    pub cookies: Option<PathBuf>,

    #[arg(long = "yt-dlp", env = "YT_DLP_PATH")]
    pub yt_dlp: Option<PathBuf>,

    #[arg(long = "ffmpeg", env = "FFMPEG_PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Where the per-request working directories are created.
    #[arg(long = "temp-dir", env = "TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    #[arg(long = "metadata-timeout-secs")]
    pub metadata_timeout_secs: Option<u64>,

    #[arg(long = "download-timeout-secs")]
    pub download_timeout_secs: Option<u64>,

    #[arg(long = "merge-timeout-secs")]
    pub merge_timeout_secs: Option<u64>,

    /// Drops a download whose client reads nothing for this long; `0` disables it.
    #[arg(long = "stall-timeout-secs")]
    pub stall_timeout_secs: Option<u64>,

    /// Config file, defaults to '<config dir>/chadloader/config.toml'.
    #[arg(long = "config", short)]
    pub config: Option<PathBuf>,

    #[arg(
        long = "verbosity",
        short,
        value_parser = clap::builder::PossibleValuesParser::new([
            "info", "debug", "error", "none", "full"
        ])
    )]
    pub verbosity: Option<String>,
}

/// The contents of the config file. Every key is optional.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub bind_address: Option<IpAddr>,
    pub cookies: Option<PathBuf>,
    pub yt_dlp: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub metadata_timeout_secs: Option<u64>,
    pub download_timeout_secs: Option<u64>,
    pub merge_timeout_secs: Option<u64>,
    pub stall_timeout_secs: Option<u64>,
    pub verbosity: Option<String>,
    pub tiers: Option<QualityTiers>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("malformed config file {}: {}", path.display(), e)))
    }
}

/// '<config dir>/chadloader/config.toml', if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("chadloader").join("config.toml"))
}

/// The resolved settings of the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server: ApiServerConfig,
    pub cookies: PathBuf,
    /// Explicit 'yt-dlp' executable, searched in `PATH` when `None`.
    pub yt_dlp: Option<PathBuf>,
    /// Explicit 'ffmpeg' executable, searched in `PATH` when `None`.
    pub ffmpeg: Option<PathBuf>,
    pub temp_dir: PathBuf,
    pub metadata_timeout: Duration,
    pub download_timeout: Option<Duration>,
    pub merge_timeout: Option<Duration>,
    pub stall_timeout: Option<Duration>,
    pub tiers: QualityTiers,
    pub verbosity: LevelFilter,
}

impl Settings {
    /// Reads the config file named by `cli`, or the default one when it exists, and merges it
    /// under the command line.
    pub fn load(cli: Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::read(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => FileConfig::read(&path)?,
                _ => FileConfig::default(),
            },
        };

        Self::merge(cli, file)
    }

    pub fn merge(cli: Cli, file: FileConfig) -> Result<Self> {
        let defaults = ApiServerConfig::default();
        let server = ApiServerConfig {
            bind_address: cli
                .bind_address
                .or(file.bind_address)
                .unwrap_or(defaults.bind_address),
            port: cli.port.or(file.port).unwrap_or(defaults.port),
        };

        let metadata_timeout_secs = cli
            .metadata_timeout_secs
            .or(file.metadata_timeout_secs)
            .unwrap_or(DEFAULT_METADATA_TIMEOUT_SECS);
        if metadata_timeout_secs == 0 {
            return Err(Error::Config(
                "the metadata timeout must be at least one second".to_string(),
            ));
        }

        let stall_timeout_secs = cli
            .stall_timeout_secs
            .or(file.stall_timeout_secs)
            .unwrap_or(DEFAULT_STALL_TIMEOUT_SECS);
        let verbosity = cli.verbosity.or(file.verbosity);

        Ok(Self {
            server,
            cookies: cli
                .cookies
                .or(file.cookies)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_COOKIES)),
            yt_dlp: cli.yt_dlp.or(file.yt_dlp),
            ffmpeg: cli.ffmpeg.or(file.ffmpeg),
            temp_dir: cli
                .temp_dir
                .or(file.temp_dir)
                .unwrap_or_else(std::env::temp_dir),
            metadata_timeout: Duration::from_secs(metadata_timeout_secs),
            download_timeout: optional_timeout(
                cli.download_timeout_secs.or(file.download_timeout_secs),
            ),
            merge_timeout: optional_timeout(cli.merge_timeout_secs.or(file.merge_timeout_secs)),
            stall_timeout: optional_timeout(Some(stall_timeout_secs)),
            tiers: file.tiers.unwrap_or_default(),
            verbosity: level_filter(verbosity.as_deref().unwrap_or("info"))?,
        })
    }
}

/// `0` and unset both mean no limit.
fn optional_timeout(secs: Option<u64>) -> Option<Duration> {
    secs.filter(|&secs| secs > 0).map(Duration::from_secs)
}

fn level_filter(verbosity: &str) -> Result<LevelFilter> {
    match verbosity {
        "none" => Ok(LevelFilter::Off),
        "error" => Ok(LevelFilter::Error),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "full" => Ok(LevelFilter::Trace),
        other => Err(Error::Config(format!("unknown verbosity '{other}'"))),
    }
}
