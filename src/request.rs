//! Request and result types for a single conversion

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Output flavour selected by the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Video,
    Audio,
}

impl Mode {
    pub fn extension(self) -> &'static str {
        match self {
            Mode::Video => "mp4",
            Mode::Audio => "mp3",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Mode::Video => "video/mp4",
            Mode::Audio => "audio/mpeg",
        }
    }

    /// Name used when the source reports no title
    pub fn fallback_title(self) -> &'static str {
        match self {
            Mode::Video => "video",
            Mode::Audio => "audio",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Video => "MP4",
            Mode::Audio => "MP3",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializationRequest {
    url: String,
    mode: Mode,
    base_name: Option<String>,
}

impl MaterializationRequest {
    /// Build a request from already validated parts. `base_name` of `None`
    /// means the source title decides the file name.
    pub fn new(url: impl Into<String>, mode: Mode, base_name: Option<String>) -> Self {
        Self {
            url: url.into(),
            mode,
            base_name,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn base_name(&self) -> Option<&str> {
        self.base_name.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializationResult {
    pub path: PathBuf,
    pub mode: Mode,
}

impl MaterializationResult {
    pub fn mime(&self) -> &'static str {
        self.mode.mime()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}
