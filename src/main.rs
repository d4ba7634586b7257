//! tubeconvert
//!
//! A small web UI that takes a video URL and hands back an MP4 or MP3.
//! Downloading and transcoding are done by yt-dlp and ffmpeg.

mod download;
mod error;
mod handler;
mod materializer;
mod protocol;
mod request;
mod server;
mod ui;
mod utils;

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// tubeconvert - paste a video URL, get an MP4 or MP3 back
#[derive(Parser, Debug)]
#[command(name = "tubeconvert")]
#[command(about = "Web UI that turns a video URL into a downloadable MP4 or MP3")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8501")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Root for per-request working directories
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// yt-dlp executable (auto-detected when omitted)
    #[arg(long)]
    ytdlp: Option<String>,

    /// ffmpeg binary or directory, passed through to yt-dlp
    #[arg(long)]
    ffmpeg_location: Option<PathBuf>,

    /// MP3 target quality
    #[arg(long, default_value = download::DEFAULT_AUDIO_QUALITY)]
    audio_quality: String,

    /// Run in background (minimal output)
    #[arg(long)]
    background: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    if !args.background {
        // RUST_LOG, when set, overrides --log-level
        let filter = EnvFilter::builder()
            .with_default_directive(default_level(&args.log_level).into())
            .from_env_lossy();

        FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    // Served paths are compared against this root, so make it absolute
    let work_dir = args.work_dir.unwrap_or_else(utils::default_work_dir);
    let work_dir = if work_dir.is_absolute() {
        work_dir
    } else {
        std::env::current_dir()?.join(work_dir)
    };

    let config = server::ServerConfig {
        host: args.host,
        port: args.port,
        work_dir,
        ytdlp: args.ytdlp.unwrap_or_else(download::get_ytdlp_command),
        ffmpeg_location: args.ffmpeg_location,
        audio_quality: args.audio_quality,
    };

    let info = server::system_info(&config);

    // Print startup banner
    if !args.background {
        let status = |ok: bool| if ok { "OK" } else { "NOT FOUND" };

        println!();
        println!("========================================================");
        println!("  tubeconvert v{}", info.version);
        println!("========================================================");
        println!("  UI:        http://{}:{}", config.host, config.port);
        println!("  Work dir:  {}", info.work_dir);
        println!("  yt-dlp:    {} [{}]", info.ytdlp, status(info.ytdlp_available));
        println!("  ffmpeg:    {}", status(info.ffmpeg_available));
        println!("  deno:      {}", if info.deno_available { "OK" } else { "not found (optional)" });
        println!("========================================================");
        println!();
    }

    if let Err(e) = server::run(config, info).await {
        error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}

/// Level for `--log-level`; unknown names fall back to info
fn default_level(name: &str) -> LevelFilter {
    name.parse().unwrap_or(LevelFilter::INFO)
}
