//! Fixed yt-dlp option sets per output mode

use crate::request::Mode;

pub const DEFAULT_AUDIO_QUALITY: &str = "192K";

const VIDEO_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/mp4";
const AUDIO_FORMAT: &str = "bestaudio/best";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTranscode {
    pub codec: &'static str,
    pub quality: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub format: &'static str,
    pub merge_output_format: Option<&'static str>,
    pub audio: Option<AudioTranscode>,
}

impl Profile {
    /// Best mp4-compatible video+audio pair, merged into a single MP4
    pub fn video() -> Self {
        Self {
            format: VIDEO_FORMAT,
            merge_output_format: Some("mp4"),
            audio: None,
        }
    }

    /// Best audio stream, transcoded to MP3 at `quality`
    pub fn audio(quality: impl Into<String>) -> Self {
        Self {
            format: AUDIO_FORMAT,
            merge_output_format: None,
            audio: Some(AudioTranscode {
                codec: "mp3",
                quality: quality.into(),
            }),
        }
    }

    pub fn for_mode(mode: Mode, audio_quality: &str) -> Self {
        match mode {
            Mode::Video => Self::video(),
            Mode::Audio => Self::audio(audio_quality),
        }
    }

    /// Format and post-processing arguments for this profile
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["-f".to_string(), self.format.to_string()];

        if let Some(container) = self.merge_output_format {
            args.push("--merge-output-format".to_string());
            args.push(container.to_string());
        }

        if let Some(ref audio) = self.audio {
            args.extend([
                "--extract-audio".to_string(),
                "--audio-format".to_string(),
                audio.codec.to_string(),
                "--audio-quality".to_string(),
                audio.quality.clone(),
            ]);
        }

        args
    }
}
