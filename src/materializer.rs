//! Turns a request into exactly one media file inside a given directory

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::download::{Extractor, Profile};
use crate::error::{ConvertError, Result};
use crate::request::{MaterializationRequest, MaterializationResult};
use crate::utils;

#[async_trait]
pub trait Materializer: Send + Sync {
    async fn materialize(
        &self,
        request: &MaterializationRequest,
        output_dir: &Path,
    ) -> Result<MaterializationResult>;
}

/// Materializer backed by an extraction tool and fixed per-mode profiles
pub struct ToolMaterializer<E> {
    extractor: E,
    audio_quality: String,
}

impl<E: Extractor> ToolMaterializer<E> {
    pub fn new(extractor: E, audio_quality: impl Into<String>) -> Self {
        Self {
            extractor,
            audio_quality: audio_quality.into(),
        }
    }
}

#[async_trait]
impl<E: Extractor> Materializer for ToolMaterializer<E> {
    async fn materialize(
        &self,
        request: &MaterializationRequest,
        output_dir: &Path,
    ) -> Result<MaterializationResult> {
        let mode = request.mode();
        let profile = Profile::for_mode(mode, &self.audio_quality);

        // A user-supplied name is known up front; the title only after the fetch.
        // A name that sanitizes to nothing counts as not given.
        let fixed_stem = request.base_name().and_then(utils::sanitize_file_stem);
        let template_stem = match fixed_stem {
            Some(ref stem) => escape_template(stem),
            None => "%(id)s".to_string(),
        };
        let template = output_dir.join(format!("{}.%(ext)s", template_stem));

        let fetched = self
            .extractor
            .fetch(request.url(), &profile, &template.to_string_lossy())
            .await?;

        let stem = match fixed_stem {
            Some(stem) => stem,
            None => fetched
                .title
                .as_deref()
                .and_then(utils::sanitize_file_stem)
                .unwrap_or_else(|| mode.fallback_title().to_string()),
        };
        let target = output_dir.join(format!("{}.{}", stem, mode.extension()));

        if let Some(produced) = fetched.path {
            if produced != target {
                debug!("Moving {} -> {}", produced.display(), target.display());
                tokio::fs::rename(&produced, &target).await?;
            }
        }

        if !tokio::fs::try_exists(&target).await? {
            return Err(ConvertError::ExternalToolFailure(format!(
                "Expected output file was not produced: {}",
                target.display()
            )));
        }

        info!("Materialized {} ({})", target.display(), mode.mime());
        Ok(MaterializationResult { path: target, mode })
    }
}

/// Escape `%` so yt-dlp treats a literal name as-is
fn escape_template(stem: &str) -> String {
    stem.replace('%', "%%")
}
