//! HTTP admin API: read, upload and delete gallery items.
//!
//! | Method   | Path                            | Body / query               |
//! |----------|---------------------------------|----------------------------|
//! | `GET`    | `/api/admin/gallery`            | none                       |
//! | `POST`   | `/api/admin/gallery`            | multipart `file`, `badge`  |
//! | `DELETE` | `/api/admin/gallery?id={src}`   | none                       |
//!
//! Handlers are thin: they pull the request apart, then hand the real work
//! to [`Pipeline`] on tokio's blocking pool, since transcoding shells out
//! and touches the filesystem. Manifest edits go through the shared
//! [`ManifestStore`], so concurrent requests are serialized at the write.
//!
//! Failures come back as `{"success": false, "error": "..."}`.

use crate::config::GalleryConfig;
use crate::ffmpeg::{Ffmpeg, VideoTool};
use crate::imaging::{ImageBackend, RustBackend};
use crate::manifest::{GalleryItem, Manifest, ManifestError, ManifestStore};
use crate::pipeline::{Pipeline, PipelineError, Upload};
use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub const GALLERY_ROUTE: &str = "/api/admin/gallery";

// ── App State ────────────────────────────────────────────────────────

/// Shared state handed to every handler.
pub struct AppState<B, V> {
    pub config: Arc<GalleryConfig>,
    pub store: Arc<ManifestStore>,
    pub backend: Arc<B>,
    pub tool: Arc<V>,
}

impl<B, V> Clone for AppState<B, V> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
            backend: Arc::clone(&self.backend),
            tool: Arc::clone(&self.tool),
        }
    }
}

impl<B: ImageBackend, V: VideoTool> AppState<B, V> {
    pub fn new(config: GalleryConfig, backend: B, tool: V) -> Self {
        let store = ManifestStore::new(config.manifest_path());
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            backend: Arc::new(backend),
            tool: Arc::new(tool),
        }
    }
}

// ── Errors ───────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::UnsupportedType(_) | PipelineError::EmptyUpload => {
                ApiError::BadRequest(err.to_string())
            }
            PipelineError::Manifest(ManifestError::ItemNotFound(_)) => {
                ApiError::NotFound(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ── Request/Response types ───────────────────────────────────────────

#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub item: GalleryItem,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Deserialize)]
pub struct DeleteQuery {
    id: Option<String>,
}

// ── Router ───────────────────────────────────────────────────────────

/// Build the router for the admin endpoints.
pub fn create_router<B, V>(state: AppState<B, V>) -> Router
where
    B: ImageBackend + Send + 'static,
    V: VideoTool + Send + 'static,
{
    let body_limit = state.config.server.max_upload_mb * 1024 * 1024;
    Router::new()
        .route(
            GALLERY_ROUTE,
            get(get_gallery::<B, V>)
                .post(post_gallery::<B, V>)
                .delete(delete_gallery::<B, V>),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Bind `bind` and serve the admin API with the production backends.
pub async fn serve(config: GalleryConfig, bind: &str) -> std::io::Result<()> {
    let tool = Ffmpeg::new(config.tools.ffmpeg.clone(), config.tool_timeout());
    let state = AppState::new(config, RustBackend::new(), tool);
    tracing::info!(
        manifest = %state.store.path().display(),
        output = %state.config.output_dir().display(),
        "admin API ready"
    );

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Listening on http://{}{}", listener.local_addr()?, GALLERY_ROUTE);
    axum::serve(listener, create_router(state)).await
}

/// Run pipeline work on the blocking pool.
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("worker task failed: {e}")))?
        .map_err(ApiError::from)
}

// ── Handlers ─────────────────────────────────────────────────────────

/// GET: the current manifest, or `[]` if it can't be read.
async fn get_gallery<B, V>(State(state): State<AppState<B, V>>) -> Json<Manifest>
where
    B: ImageBackend + Send + 'static,
    V: VideoTool + Send + 'static,
{
    let store = Arc::clone(&state.store);
    let manifest = run_blocking(move || store.read().map_err(PipelineError::from)).await;
    match manifest {
        Ok(m) => Json(m),
        Err(e) => {
            tracing::warn!(error = %e, "manifest unreadable, serving empty gallery");
            Json(Vec::new())
        }
    }
}

/// POST: transcode an uploaded file into the `Uploads` group.
async fn post_gallery<B, V>(
    State(state): State<AppState<B, V>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError>
where
    B: ImageBackend + Send + 'static,
    V: VideoTool + Send + 'static,
{
    let mut upload = None;
    let mut badge = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                upload = Some(Upload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("badge") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                badge = Some(text);
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| ApiError::BadRequest("No file uploaded".into()))?;

    let item = run_blocking(move || {
        let pipeline = Pipeline::new(&state.config, state.backend.as_ref(), state.tool.as_ref());
        pipeline.upload(&state.store, &upload, badge.as_deref())
    })
    .await?;

    Ok(Json(UploadResponse {
        success: true,
        item,
    }))
}

/// DELETE: remove the item whose `src` is `?id=`.
async fn delete_gallery<B, V>(
    State(state): State<AppState<B, V>>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<DeleteResponse>, ApiError>
where
    B: ImageBackend + Send + 'static,
    V: VideoTool + Send + 'static,
{
    let src = query
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing id".into()))?;

    run_blocking(move || {
        let pipeline = Pipeline::new(&state.config, state.backend.as_ref(), state.tool.as_ref());
        pipeline.delete(&state.store, &src)
    })
    .await?;

    Ok(Json(DeleteResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffmpeg::tests::MockVideoTool;
    use crate::imaging::backend::tests::MockBackend;
    use crate::manifest;
    use crate::test_helpers::{find_item, group_names, write_files};
    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "gallery-test-boundary";

    fn state_for(tmp: &TempDir) -> AppState<MockBackend, MockVideoTool> {
        let mut config = GalleryConfig::default();
        config.paths.input = tmp.path().join("gallery").to_string_lossy().into_owned();
        config.paths.manifest = tmp.path().join("gallery.json").to_string_lossy().into_owned();
        std::fs::create_dir_all(config.input_dir()).unwrap();
        AppState::new(config, MockBackend::new(), MockVideoTool::new())
    }

    fn multipart_body(file: Option<(&str, &str, &[u8])>, badge: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some((name, mime, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: {mime}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        if let Some(badge) = badge {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"badge\"\r\n\r\n{badge}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::post(GALLERY_ROUTE)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn get_returns_empty_array_without_manifest() {
        let tmp = TempDir::new().unwrap();
        let router = create_router(state_for(&tmp));
        let (status, body) = send(
            router,
            Request::get(GALLERY_ROUTE).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Array(vec![]));
    }

    #[tokio::test]
    async fn get_returns_empty_array_for_corrupt_manifest() {
        let tmp = TempDir::new().unwrap();
        let state = state_for(&tmp);
        std::fs::write(state.store.path(), "{ not json").unwrap();
        let (status, body) = send(
            create_router(state),
            Request::get(GALLERY_ROUTE).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Array(vec![]));
    }

    #[tokio::test]
    async fn upload_adds_item_with_badge() {
        let tmp = TempDir::new().unwrap();
        let state = state_for(&tmp);
        let router = create_router(state.clone());

        let body = multipart_body(Some(("look.jpg", "image/jpeg", b"jpeg bytes")), Some("signature"));
        let (status, json) = send(router, upload_request(body)).await;

        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["success"], true);
        assert_eq!(json["item"]["type"], "image");
        assert_eq!(json["item"]["badge"], "Signature");
        assert_eq!(json["item"]["badgeType"], "signature");

        let src = json["item"]["src"].as_str().unwrap();
        let manifest = state.store.read().unwrap();
        assert_eq!(group_names(&manifest), vec![manifest::UPLOADS_GROUP]);
        assert_eq!(find_item(&manifest, src).width, 1200);
    }

    #[tokio::test]
    async fn upload_without_file_is_bad_request() {
        let tmp = TempDir::new().unwrap();
        let router = create_router(state_for(&tmp));
        let (status, json) = send(router, upload_request(multipart_body(None, Some("signature")))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn upload_of_unsupported_type_is_bad_request() {
        let tmp = TempDir::new().unwrap();
        let router = create_router(state_for(&tmp));
        let body = multipart_body(Some(("notes.txt", "text/plain", b"hello")), None);
        let (status, json) = send(router, upload_request(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn failed_transcode_is_server_error() {
        let tmp = TempDir::new().unwrap();
        let base = state_for(&tmp);
        let state = AppState {
            tool: Arc::new(MockVideoTool {
                fail_compress: true,
                ..MockVideoTool::new()
            }),
            ..base
        };
        let body = multipart_body(Some(("clip.mp4", "video/mp4", b"mp4 bytes")), None);
        let (status, json) = send(create_router(state.clone()), upload_request(body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["success"], false);
        assert!(!state.store.path().exists());
    }

    #[tokio::test]
    async fn delete_requires_id() {
        let tmp = TempDir::new().unwrap();
        let router = create_router(state_for(&tmp));
        let (status, json) = send(
            router,
            Request::delete(GALLERY_ROUTE).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Missing id");
    }

    #[tokio::test]
    async fn delete_unknown_src_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let router = create_router(state_for(&tmp));
        let (status, json) = send(
            router,
            Request::delete(format!("{GALLERY_ROUTE}?id=/gallery/missing.avif"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn delete_after_build_removes_group() {
        let tmp = TempDir::new().unwrap();
        let state = state_for(&tmp);
        write_files(&state.config.input_dir(), &["Meera_1.jpg", "Aish_1.jpg"]);
        Pipeline::new(&state.config, state.backend.as_ref(), state.tool.as_ref())
            .build(true)
            .unwrap();

        let (status, json) = send(
            create_router(state.clone()),
            Request::delete(format!("{GALLERY_ROUTE}?id=/gallery/bride_meera_1.avif"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({ "success": true }));
        assert_eq!(group_names(&state.store.read().unwrap()), vec!["Aish"]);
        assert!(!state.config.output_dir().join("bride_meera_1.avif").exists());
    }
}
