//! yt-dlp invocation with progress logging
//!
//! Handles tool discovery, argument assembly and parsing of what yt-dlp
//! prints once the final file has been moved into place.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tracing::{debug, info, warn};

use super::{Extractor, FetchedItem, Profile};
use crate::error::{ConvertError, Result};

const NOT_FOUND_MESSAGE: &str = "yt-dlp not found. Install with: pip install yt-dlp";

/// Keep this many trailing stderr lines for error reporting
const STDERR_TAIL: usize = 20;

/// Find yt-dlp executable, checking common install locations
fn find_ytdlp() -> Option<PathBuf> {
    // First check if yt-dlp is in PATH
    if let Ok(output) = std::process::Command::new("yt-dlp").arg("--version").output() {
        if output.status.success() {
            return Some(PathBuf::from("yt-dlp"));
        }
    }

    // On Windows, check common Python user install locations
    #[cfg(windows)]
    {
        for var in ["APPDATA", "LOCALAPPDATA"] {
            let Ok(base) = std::env::var(var) else { continue };
            let python_dir = if var == "APPDATA" {
                PathBuf::from(&base).join("Python")
            } else {
                PathBuf::from(&base).join("Programs").join("Python")
            };
            if let Ok(entries) = std::fs::read_dir(python_dir) {
                for entry in entries.flatten() {
                    let scripts = entry.path().join("Scripts").join("yt-dlp.exe");
                    if scripts.exists() {
                        return Some(scripts);
                    }
                }
            }
        }
    }

    None
}

/// Find ffmpeg, which yt-dlp needs for merging and audio extraction
pub fn find_ffmpeg() -> Option<PathBuf> {
    match std::process::Command::new("ffmpeg").arg("-version").output() {
        Ok(output) if output.status.success() => Some(PathBuf::from("ffmpeg")),
        _ => None,
    }
}

/// Find deno executable for yt-dlp JavaScript runtime
pub fn find_deno() -> Option<PathBuf> {
    match std::process::Command::new("deno").arg("--version").output() {
        Ok(output) if output.status.success() => Some(PathBuf::from("deno")),
        _ => None,
    }
}

/// Get yt-dlp command path
pub fn get_ytdlp_command() -> String {
    find_ytdlp()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "yt-dlp".to_string())
}

/// Build yt-dlp args with deno runtime if available
fn get_deno_args() -> Vec<String> {
    if let Some(deno_path) = find_deno() {
        vec![
            "--js-runtimes".to_string(),
            format!("deno:{}", deno_path.to_string_lossy()),
        ]
    } else {
        vec![]
    }
}

/// The real extraction collaborator, driving a yt-dlp child process
#[derive(Debug, Clone)]
pub struct YtDlp {
    command: String,
    ffmpeg_location: Option<PathBuf>,
    runtime_args: Vec<String>,
}

impl YtDlp {
    pub fn new(command: impl Into<String>, ffmpeg_location: Option<PathBuf>) -> Self {
        Self {
            command: command.into(),
            ffmpeg_location,
            runtime_args: get_deno_args(),
        }
    }

    fn build_args(&self, url: &str, profile: &Profile, output_template: &str) -> Vec<String> {
        let mut args = self.runtime_args.clone();
        args.extend(profile.args());
        args.extend(
            [
                "-o",
                output_template,
                "--no-playlist",
                "--no-warnings",
                "--newline", // Progress on separate lines
                "--progress",
                "--print",
                "after_move:title",
                "--print",
                "after_move:filepath",
            ]
            .map(String::from),
        );
        if let Some(ref location) = self.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(location.to_string_lossy().to_string());
        }
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl Extractor for YtDlp {
    async fn fetch(&self, url: &str, profile: &Profile, output_template: &str) -> Result<FetchedItem> {
        let args = self.build_args(url, profile, output_template);
        debug!("Running {} {:?}", self.command, args);

        let mut child = match TokioCommand::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConvertError::ExternalToolFailure(NOT_FOUND_MESSAGE.to_string()));
            }
            Err(e) => return Err(ConvertError::ExternalToolFailure(e.to_string())),
        };

        // Stream stderr for progress, keeping the tail for error reporting
        let mut tail: Vec<String> = Vec::new();
        if let Some(stderr) = child.stderr.take() {
            let mut lines = BufReader::new(stderr).lines();
            let mut last_percent: u8 = 0;
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(percent) = parse_progress(&line) {
                    // Only log if changed by at least 5%
                    if percent >= last_percent.saturating_add(5) || (percent == 100 && last_percent != 100) {
                        last_percent = percent;
                        info!("[yt-dlp] Progress: {}%", percent);
                    }
                    continue;
                }
                if line.contains("Merging") || line.contains("ExtractAudio") {
                    info!("[yt-dlp] {}", line);
                } else if !line.trim().is_empty() {
                    debug!("[yt-dlp] {}", line);
                }
                if tail.len() == STDERR_TAIL {
                    tail.remove(0);
                }
                tail.push(line);
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ConvertError::ExternalToolFailure(e.to_string()))?;

        if !output.status.success() {
            let message = failure_message(&tail, output.status.code());
            warn!("yt-dlp failed: {}", message);
            return Err(ConvertError::ExternalToolFailure(message));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let item = parse_print_output(&stdout);
        if let Some(ref path) = item.path {
            info!("Download complete: {}", path.display());
        }
        Ok(item)
    }
}

/// Parse a percentage from a progress line like `[download]  45.2% of 100.00MiB`
fn parse_progress(line: &str) -> Option<u8> {
    let rest = line.strip_prefix("[download]")?;
    let pct_part = rest.split_whitespace().next()?.strip_suffix('%')?;
    let pct = pct_part.parse::<f32>().ok()?;
    Some(pct.clamp(0.0, 100.0) as u8)
}

/// yt-dlp prints the title then the final path, one per line
fn parse_print_output(stdout: &str) -> FetchedItem {
    let lines: Vec<&str> = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    match lines.as_slice() {
        [] => FetchedItem::default(),
        [path] => FetchedItem {
            title: None,
            path: Some(Path::new(path).to_path_buf()),
        },
        [.., title, path] => FetchedItem {
            // yt-dlp prints NA for fields the extractor could not fill
            title: (*title != "NA").then(|| title.to_string()),
            path: Some(Path::new(path).to_path_buf()),
        },
    }
}

/// Pick the most useful line from yt-dlp's stderr, verbatim
fn failure_message(stderr_tail: &[String], code: Option<i32>) -> String {
    stderr_tail
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| stderr_tail.iter().rev().find(|l| !l.trim().is_empty()))
        .cloned()
        .unwrap_or_else(|| match code {
            Some(code) => format!("yt-dlp exited with status {}", code),
            None => "yt-dlp was terminated by a signal".to_string(),
        })
}
