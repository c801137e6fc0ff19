//! Stamp Image Server
//!
//! Renders canvas data posted as JSON and answers with the PNG.
//!
//! ## Protocol
//!
//! ```text
//! POST /create-image   {"height": 200, "width": 300, "shapes": [...]}
//! 200 image/png        rendered stamp
//! 400                  {"code": "E_INVALID_JSON"}
//! 422                  {"code": "E_NO_RENDER_TARGET"}
//! 500                  {"code": "E_EXPORT_FAILED"}
//! ```

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use stamp_core::CanvasData;
use stamp_export::{ExportError, ExportOptions};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "stamp-server", about = "Image generator API for stamps")]
struct Cli {
    /// The port to run the server on
    #[arg(short, long, env = "STAMP_PORT", default_value_t = 11000)]
    port: u16,

    /// Print more logs
    #[arg(short, long)]
    debug: bool,

    /// Directory resolving stored image references
    #[arg(long, env = "STAMP_FILES_DIR")]
    files_dir: Option<PathBuf>,

    /// Where render bundles are staged
    #[arg(long, env = "STAMP_WORK_DIR")]
    work_dir: Option<PathBuf>,
}

/// Error body
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
}

/// Shared application state
struct AppState {
    debug: bool,
    files_dir: Option<PathBuf>,
    work_dir: PathBuf,
    /// Directory for rendered files, removed after each response.
    output_dir: PathBuf,
    /// Exports run one at a time.
    export_lock: Mutex<()>,
}

impl AppState {
    fn new(cli: &Cli) -> Self {
        Self {
            debug: cli.debug,
            files_dir: cli.files_dir.clone(),
            work_dir: cli
                .work_dir
                .clone()
                .unwrap_or_else(|| std::env::temp_dir().join("stamp-server")),
            output_dir: std::env::temp_dir(),
            export_lock: Mutex::new(()),
        }
    }

    /// Options for one request. Each request stages its bundle in its own
    /// work directory, removed once the response is built.
    fn export_options(&self, request_id: Uuid, input: String) -> ExportOptions {
        let output = self.output_dir.join(format!("{}.png", request_id));
        let work_dir = self.work_dir.join(request_id.to_string());
        let mut options = ExportOptions::new(output, input).with_work_dir(work_dir);
        options.debug = self.debug;
        options.files_dir = self.files_dir.clone();
        options
    }
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/create-image", post(create_image))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.debug {
        "stamp_server=debug,stamp_export=debug,tower_http=debug"
    } else {
        "stamp_server=info,stamp_export=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let state = Arc::new(AppState::new(&cli));
    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Image generator API listening on {}", addr);
    axum::serve(listener, app(state)).await
}

/// Index page
async fn index() -> &'static str {
    "Stamp image generator API - POST canvas JSON to /create-image"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

fn error_response(status: StatusCode, code: &'static str) -> Response {
    (status, Json(ErrorBody { code })).into_response()
}

/// Render the posted canvas and stream the PNG back.
async fn create_image(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let json: Value = match serde_json::from_slice(&body) {
        Ok(json) => json,
        Err(e) => {
            warn!("Rejected request body: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "E_INVALID_JSON");
        }
    };
    if state.debug {
        debug!("Processing request JSON {}", json);
    }
    if !CanvasData::validate_export_payload(&json) {
        return error_response(StatusCode::BAD_REQUEST, "E_INVALID_JSON");
    }

    let request_id = Uuid::new_v4();
    let options = state.export_options(request_id, json.to_string());
    let path = options.output.clone();

    let result = {
        let _guard = state.export_lock.lock().await;
        stamp_export::export(&options).await
    };

    let response = match result {
        Ok(report) => match tokio::fs::read(&path).await {
            Ok(bytes) => {
                info!(
                    "Request {} rendered {}x{}",
                    request_id, report.width, report.height
                );
                ([(header::CONTENT_TYPE, "image/png")], bytes).into_response()
            }
            Err(e) => {
                error!("Request {}: failed to read {}: {}", request_id, path.display(), e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "E_EXPORT_FAILED")
            }
        },
        Err(ExportError::NoRenderTarget) => {
            warn!("Request {}: no render target", request_id);
            error_response(StatusCode::UNPROCESSABLE_ENTITY, "E_NO_RENDER_TARGET")
        }
        Err(e) if e.is_invalid_input() => {
            warn!("Request {}: {}", request_id, e);
            error_response(StatusCode::BAD_REQUEST, "E_INVALID_JSON")
        }
        Err(e) => {
            error!("Request {}: {}", request_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "E_EXPORT_FAILED")
        }
    };

    if let Err(e) = tokio::fs::remove_file(&path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            error!("Error removing file {}: {}", path.display(), e);
        }
    }
    if let Err(e) = tokio::fs::remove_dir_all(&options.work_dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            error!("Error removing {}: {}", options.work_dir.display(), e);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(dir: &std::path::Path) -> Arc<AppState> {
        Arc::new(AppState {
            debug: false,
            files_dir: None,
            work_dir: dir.join("work"),
            output_dir: dir.join("out"),
            export_lock: Mutex::new(()),
        })
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn files_in(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_invalid_body() {
        let dir = tempfile::tempdir().unwrap();
        let response = create_image(State(state(dir.path())), Bytes::from_static(b"{oops")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "E_INVALID_JSON");
    }

    #[tokio::test]
    async fn test_missing_width() {
        let dir = tempfile::tempdir().unwrap();
        let body = Bytes::from_static(br#"{"height":10,"shapes":[]}"#);
        let response = create_image(State(state(dir.path())), body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "E_INVALID_JSON");
    }

    #[tokio::test]
    async fn test_shapes_must_be_array() {
        let dir = tempfile::tempdir().unwrap();
        let body = Bytes::from_static(br#"{"height":10,"width":10,"shapes":{}}"#);
        let response = create_image(State(state(dir.path())), body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_too_small_canvas_has_no_render_target() {
        let dir = tempfile::tempdir().unwrap();
        let body = Bytes::from_static(br#"{"height":0,"width":10,"shapes":[]}"#);
        let response = create_image(State(state(dir.path())), body).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["code"], "E_NO_RENDER_TARGET");
    }

    #[tokio::test]
    async fn test_renders_png_and_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        std::fs::create_dir_all(&state.output_dir).unwrap();
        let body = Bytes::from_static(br#"{"height":20,"width":30,"shapes":[
            {"type":"Rect","x":2,"y":2,"width":10,"height":10,"fill":"red"}
        ]}"#);

        let response = create_image(State(state.clone()), body).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "image/png"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        assert_eq!(files_in(&state.output_dir), 0);
    }

    #[tokio::test]
    async fn test_oversized_canvas_has_no_render_target() {
        let dir = tempfile::tempdir().unwrap();
        let body = Bytes::from_static(br#"{"height":40000,"width":40000,"shapes":[]}"#);
        let response = create_image(State(state(dir.path())), body).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["code"], "E_NO_RENDER_TARGET");
    }

    #[tokio::test]
    async fn test_work_dir_is_empty_after_requests() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let pixel = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";
        for (i, source) in [pixel, "data:image/png;base64,AAAA"].iter().enumerate() {
            let body = format!(
                r#"{{"height":20,"width":20,"shapes":[
                    {{"type":"Image","id":"img-{}","x":0,"y":0,"width":20,"height":20,"image":"{}"}}
                ]}}"#,
                i, source
            );
            let response = create_image(State(state.clone()), Bytes::from(body)).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(files_in(&state.work_dir), 0);
        assert_eq!(files_in(&state.output_dir), 0);
    }

    #[tokio::test]
    async fn test_index_and_health() {
        assert!(index().await.contains("/create-image"));
        assert_eq!(health().await, "ok");
    }
}
