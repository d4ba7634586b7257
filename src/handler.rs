//! Single-shot conversion handler
//!
//! Validates the raw user input, creates a fresh directory for the request
//! and runs the materializer exactly once. Every failure is turned into a
//! message for the user; nothing here panics or retries.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{ConvertError, Result};
use crate::materializer::Materializer;
use crate::request::{MaterializationRequest, MaterializationResult, Mode};

/// Raw values as submitted by the user, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConvertInput {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub filename: Option<String>,
}

/// What the presentation layer renders
#[derive(Debug)]
pub enum Outcome {
    Ready(MaterializationResult),
    Failed { error: ConvertError, message: String },
}

impl ConvertInput {
    /// Trim and validate into a request. An empty URL is rejected;
    /// an empty filename means "use the title".
    pub fn into_request(self) -> Result<MaterializationRequest> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ConvertError::InvalidInput);
        }
        let base_name = self
            .filename
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());
        Ok(MaterializationRequest::new(url, self.mode, base_name))
    }
}

/// Run one conversion and map the result to an [`Outcome`]
pub async fn handle(input: ConvertInput, work_root: &Path, materializer: &dyn Materializer) -> Outcome {
    match convert(input, work_root, materializer).await {
        Ok(result) => Outcome::Ready(result),
        Err(error) => {
            warn!("Conversion failed: {}", error);
            let message = error.user_message();
            Outcome::Failed { error, message }
        }
    }
}

async fn convert(
    input: ConvertInput,
    work_root: &Path,
    materializer: &dyn Materializer,
) -> Result<MaterializationResult> {
    let request = input.into_request()?;
    let output_dir = create_request_dir(work_root).await?;
    info!(
        "Converting {} to {} in {}",
        request.url(),
        request.mode().label(),
        output_dir.display()
    );
    materializer.materialize(&request, &output_dir).await
}

/// Create a new, uniquely named directory under `work_root`. Never reuses an
/// existing directory and never removes it afterwards.
pub async fn create_request_dir(work_root: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(work_root).await?;
    let dir = work_root.join(format!("yt_{}", uuid::Uuid::new_v4().simple()));
    tokio::fs::create_dir(&dir).await?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materializer::tests::FakeExtractor;
    use crate::materializer::ToolMaterializer;
    use std::sync::atomic::Ordering;

    fn input(url: &str, mode: Mode, filename: Option<&str>) -> ConvertInput {
        ConvertInput {
            url: url.to_string(),
            mode,
            filename: filename.map(String::from),
        }
    }

    #[test]
    fn test_into_request_trims_fields() {
        let request = input("  https://youtu.be/abc123 \n", Mode::Audio, Some("  track1 "))
            .into_request()
            .unwrap();
        assert_eq!(request.url(), "https://youtu.be/abc123");
        assert_eq!(request.base_name(), Some("track1"));

        let request = input("https://youtu.be/abc123", Mode::Video, Some("   "))
            .into_request()
            .unwrap();
        assert_eq!(request.base_name(), None);
    }

    #[tokio::test]
    async fn test_blank_url_never_reaches_materializer() {
        let root = tempfile::tempdir().unwrap();
        let extractor = FakeExtractor::titled("Sample Clip");
        let calls = extractor.calls.clone();
        let materializer = ToolMaterializer::new(extractor, "192K");

        for url in ["", "   ", "\t\n"] {
            let outcome = handle(input(url, Mode::Video, None), root.path(), &materializer).await;
            assert!(matches!(outcome, Outcome::Failed { error: ConvertError::InvalidInput, .. }));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_video_scenario() {
        let root = tempfile::tempdir().unwrap();
        let materializer = ToolMaterializer::new(FakeExtractor::titled("Sample Clip"), "192K");

        let outcome = handle(input("https://youtu.be/abc123", Mode::Video, None), root.path(), &materializer).await;

        match outcome {
            Outcome::Ready(result) => {
                assert!(result.path.ends_with("Sample Clip.mp4"));
                assert!(result.path.starts_with(root.path()));
                assert!(result.path.is_absolute());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_audio_scenario_with_base_name() {
        let root = tempfile::tempdir().unwrap();
        let materializer = ToolMaterializer::new(FakeExtractor::titled("Sample Clip"), "192K");

        let outcome = handle(
            input("https://youtu.be/abc123", Mode::Audio, Some("track1")),
            root.path(),
            &materializer,
        )
        .await;

        match outcome {
            Outcome::Ready(result) => assert!(result.path.ends_with("track1.mp3")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_same_request_twice_uses_distinct_dirs() {
        let root = tempfile::tempdir().unwrap();
        let materializer = ToolMaterializer::new(FakeExtractor::titled("Sample Clip"), "192K");

        let mut paths = Vec::new();
        for _ in 0..2 {
            match handle(input("https://youtu.be/abc123", Mode::Video, None), root.path(), &materializer).await {
                Outcome::Ready(result) => paths.push(result.path),
                other => panic!("unexpected outcome: {:?}", other),
            }
        }

        assert_ne!(paths[0].parent(), paths[1].parent());
        assert!(paths[0].exists());
        assert!(paths[1].exists());
    }

    #[tokio::test]
    async fn test_tool_failure_reports_original_text() {
        let root = tempfile::tempdir().unwrap();
        let materializer = ToolMaterializer::new(
            FakeExtractor::failing("ERROR: Unable to download webpage: The read operation timed out"),
            "192K",
        );

        let outcome = handle(input("https://youtu.be/abc123", Mode::Video, None), root.path(), &materializer).await;

        match outcome {
            Outcome::Failed { error, message } => {
                assert!(matches!(error, ConvertError::ExternalToolFailure(_)));
                assert!(message.contains("The read operation timed out"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        // One empty request directory, no media file
        let dirs: Vec<_> = std::fs::read_dir(root.path()).unwrap().flatten().collect();
        assert_eq!(dirs.len(), 1);
        assert_eq!(std::fs::read_dir(dirs[0].path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unusable_work_root_is_filesystem_failure() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let materializer = ToolMaterializer::new(FakeExtractor::titled("Sample Clip"), "192K");

        let outcome = handle(input("https://youtu.be/abc123", Mode::Video, None), &blocker, &materializer).await;

        assert!(matches!(outcome, Outcome::Failed { error: ConvertError::FilesystemFailure(_), .. }));
    }
}
