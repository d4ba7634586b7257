//! Media extraction through yt-dlp

mod profile;
mod ytdlp;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;

pub use profile::{Profile, DEFAULT_AUDIO_QUALITY};
pub use ytdlp::{find_deno, find_ffmpeg, get_ytdlp_command, YtDlp};

/// What the extraction tool reported about the item it fetched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedItem {
    pub title: Option<String>,
    pub path: Option<PathBuf>,
}

/// The collaborator that talks to the remote host and writes the media file.
///
/// `output_template` uses yt-dlp template syntax: `%(ext)s` is replaced by the
/// final extension and `%(id)s` by the source's id.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn fetch(&self, url: &str, profile: &Profile, output_template: &str) -> Result<FetchedItem>;
}
