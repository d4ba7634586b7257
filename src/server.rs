//! HTTP server: browser UI, JSON API and file retrieval

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use warp::http::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE};
use warp::http::StatusCode;
use warp::{Filter, Reply};

use crate::download::{self, YtDlp};
use crate::handler::{self, ConvertInput, Outcome};
use crate::materializer::{Materializer, ToolMaterializer};
use crate::protocol::{ConvertedFile, Response, SystemInfo};
use crate::ui;
use crate::utils;

/// Form and JSON bodies are tiny
const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Server configuration
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub work_dir: PathBuf,
    pub ytdlp: String,
    pub ffmpeg_location: Option<PathBuf>,
    pub audio_quality: String,
}

/// Shared, read-only state handed to every route
#[derive(Clone)]
pub struct AppState {
    work_dir: Arc<PathBuf>,
    materializer: Arc<dyn Materializer>,
    info: Arc<SystemInfo>,
}

impl AppState {
    pub fn new(work_dir: PathBuf, materializer: Arc<dyn Materializer>, info: SystemInfo) -> Self {
        Self {
            work_dir: Arc::new(work_dir),
            materializer,
            info: Arc::new(info),
        }
    }
}

/// Probe the external tools for the banner and `/api/info`
pub fn system_info(config: &ServerConfig) -> SystemInfo {
    let ytdlp_available = std::process::Command::new(&config.ytdlp)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);

    SystemInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        ytdlp: config.ytdlp.clone(),
        ytdlp_available,
        ffmpeg_available: config.ffmpeg_location.is_some() || download::find_ffmpeg().is_some(),
        deno_available: download::find_deno().is_some(),
        work_dir: config.work_dir.to_string_lossy().to_string(),
    }
}

/// Run the HTTP server until the process exits
pub async fn run(config: ServerConfig, info: SystemInfo) -> Result<()> {
    let work_dir = utils::prepare_work_root(&config.work_dir).await?;

    let extractor = YtDlp::new(config.ytdlp.clone(), config.ffmpeg_location.clone());
    let materializer = ToolMaterializer::new(extractor, config.audio_quality.clone());
    let state = AppState::new(work_dir, Arc::new(materializer), info);

    let addr = SocketAddr::new(config.host, config.port);
    info!("HTTP server listening on http://{}", addr);
    warp::serve(routes(state)).run(addr).await;

    Ok(())
}

pub fn routes(state: AppState) -> impl Filter<Extract = (warp::reply::Response,), Error = warp::Rejection> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .map(|| warp::reply::html(ui::index_page()).into_response());

    let convert_form = warp::path("convert")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::form::<ConvertInput>())
        .and(with_state(state.clone()))
        .then(convert_page);

    let convert_api = warp::path!("api" / "convert")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json::<ConvertInput>())
        .and(with_state(state.clone()))
        .then(convert_json);

    let info_route = warp::path!("api" / "info")
        .and(warp::get())
        .and(with_state(state.clone()))
        .map(|state: AppState| warp::reply::json(&*state.info).into_response());

    let file = warp::path("file")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state))
        .then(serve_file);

    index
        .or(convert_form)
        .unify()
        .or(convert_api)
        .unify()
        .or(info_route)
        .unify()
        .or(file)
        .unify()
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

async fn convert_page(input: ConvertInput, state: AppState) -> warp::reply::Response {
    let url = input.url.clone();
    let mode = input.mode;
    let filename = input.filename.clone().unwrap_or_default();

    let outcome = handler::handle(input, &state.work_dir, state.materializer.as_ref()).await;
    warp::reply::html(ui::outcome_page(&outcome, &url, mode, &filename)).into_response()
}

async fn convert_json(input: ConvertInput, state: AppState) -> warp::reply::Response {
    let response = match handler::handle(input, &state.work_dir, state.materializer.as_ref()).await {
        Outcome::Ready(result) => match serde_json::to_value(ConvertedFile::from_result(&result)) {
            Ok(data) => Response::ok(data),
            Err(e) => Response::error(e.to_string()),
        },
        Outcome::Failed { message, .. } => Response::error(message),
    };
    warp::reply::json(&response).into_response()
}

fn text_response(status: StatusCode, body: impl Into<String>) -> warp::reply::Response {
    warp::reply::with_status(body.into(), status).into_response()
}

/// Serve a materialized file from inside the work root
async fn serve_file(params: HashMap<String, String>, state: AppState) -> warp::reply::Response {
    let path = match params.get("path") {
        Some(p) => PathBuf::from(p),
        None => {
            warn!("HTTP: No path parameter");
            return text_response(StatusCode::BAD_REQUEST, "Missing path parameter");
        }
    };

    if !path.is_absolute() {
        warn!("HTTP: Path not absolute: {:?}", path);
        return text_response(StatusCode::BAD_REQUEST, "Path must be absolute");
    }

    if !utils::is_path_allowed(&path, &state.work_dir) {
        warn!("HTTP: Rejected file request for: {}", path.display());
        return text_response(StatusCode::FORBIDDEN, "Path not in allowed directory");
    }

    // Resolve symlinks so a link inside the root cannot point outside it
    let resolved = match tokio::fs::canonicalize(&path).await {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return text_response(StatusCode::NOT_FOUND, format!("File not found: {}", path.display()));
        }
        Err(e) => {
            warn!("HTTP: Cannot resolve {}: {}", path.display(), e);
            return text_response(StatusCode::FORBIDDEN, "Path not in allowed directory");
        }
    };
    let root = match tokio::fs::canonicalize(state.work_dir.as_path()).await {
        Ok(root) => root,
        Err(e) => {
            warn!("HTTP: Cannot resolve work dir: {}", e);
            return text_response(StatusCode::FORBIDDEN, "Path not in allowed directory");
        }
    };
    if !utils::is_path_allowed(&resolved, &root) {
        warn!("HTTP: Rejected {} (resolves to {})", path.display(), resolved.display());
        return text_response(StatusCode::FORBIDDEN, "Path not in allowed directory");
    }

    let data = match tokio::fs::read(&resolved).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return text_response(StatusCode::NOT_FOUND, format!("File not found: {}", path.display()));
        }
        Err(e) => {
            warn!("HTTP: Failed to read {}: {}", path.display(), e);
            return text_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to read: {}", e));
        }
    };

    info!("HTTP: Serving {} ({} bytes)", path.display(), data.len());
    let mut response = data.into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(utils::content_type_for(&path)));

    if params.get("download").map(String::as_str) == Some("1") {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if let Ok(value) = HeaderValue::from_str(&content_disposition(&name)) {
            response.headers_mut().insert(CONTENT_DISPOSITION, value);
        }
    }

    response
}

/// `attachment` header with an ASCII fallback and the UTF-8 name
fn content_disposition(name: &str) -> String {
    let ascii: String = name
        .chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(name)
    )
}
