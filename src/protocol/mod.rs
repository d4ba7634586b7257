//! JSON message types for the HTTP API

use serde::{Deserialize, Serialize};

use crate::request::MaterializationResult;

/// Outgoing responses
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Ok(OkResponse),
    Error(ErrorResponse),
}

#[derive(Debug, Clone, Serialize)]
pub struct OkResponse {
    pub ok: bool,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: ErrorInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
}

/// A finished conversion, as reported to API clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedFile {
    pub path: String,
    pub file_name: String,
    pub mime: String,
    pub file_url: String,
}

impl ConvertedFile {
    pub fn from_result(result: &MaterializationResult) -> Self {
        let path = result.path.to_string_lossy().to_string();
        Self {
            file_url: file_url(&path, false),
            file_name: result.file_name(),
            mime: result.mime().to_string(),
            path,
        }
    }
}

/// Capabilities of this server
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub version: String,
    pub ytdlp: String,
    pub ytdlp_available: bool,
    pub ffmpeg_available: bool,
    pub deno_available: bool,
    pub work_dir: String,
}

// Helper functions for creating responses
impl Response {
    pub fn ok(data: serde_json::Value) -> Self {
        Response::Ok(OkResponse { ok: true, data })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error(ErrorResponse {
            ok: false,
            error: ErrorInfo {
                message: message.into(),
            },
        })
    }
}

/// Link to the file-serving route for `path`
pub fn file_url(path: &str, download: bool) -> String {
    let mut url = format!("/file?path={}", urlencoding::encode(path));
    if download {
        url.push_str("&download=1");
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Mode;
    use std::path::PathBuf;

    #[test]
    fn test_error_response_shape() {
        let json = serde_json::to_value(Response::error("boom")).unwrap();
        assert_eq!(json, serde_json::json!({ "ok": false, "error": { "message": "boom" } }));
    }

    #[test]
    fn test_converted_file_fields() {
        let result = MaterializationResult {
            path: PathBuf::from("/tmp/yt_1/track1.mp3"),
            mode: Mode::Audio,
        };
        let json = serde_json::to_value(ConvertedFile::from_result(&result)).unwrap();
        assert_eq!(json["fileName"], "track1.mp3");
        assert_eq!(json["mime"], "audio/mpeg");
        assert_eq!(json["fileUrl"], "/file?path=%2Ftmp%2Fyt_1%2Ftrack1.mp3");
    }

    #[test]
    fn test_file_url_download_flag() {
        assert_eq!(file_url("/a b.mp4", true), "/file?path=%2Fa%20b.mp4&download=1");
    }
}
