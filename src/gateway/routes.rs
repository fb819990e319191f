//! Gateway Routes - 与生成服务相同的 `/api` 路径
//!
//! 所有请求转发到配置的上游；仅 `/api/ping` 在本地应答

use axum::{
    extract::{multipart::Field, Multipart, OriginalUri, State},
    http::{HeaderMap, Method},
    response::Response,
    routing::{get, post},
    Router,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

use super::client::{UploadFile, UpstreamClient};
use super::error::GatewayError;
use crate::config::GatewayConfig;
use crate::infrastructure::http::handlers::ping;
use crate::infrastructure::http::with_common_layers;

/// Gateway 状态
pub struct GatewayState {
    pub upstream: UpstreamClient,
    /// 上传文件暂存目录
    pub temp_dir: PathBuf,
    pub max_upload_size: u64,
}

impl GatewayState {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            upstream: UpstreamClient::new(config.base_url.clone(), config.timeout_secs)?,
            temp_dir: config.temp_dir.clone(),
            max_upload_size: config.max_upload_size,
        })
    }
}

/// 创建 Gateway 路由
pub fn create_routes() -> Router<Arc<GatewayState>> {
    let api = Router::new()
        .route("/ping", get(ping))
        .route("/audiobooks", post(create_audiobook))
        .route("/tasks/:job_id", get(relay))
        .route("/books", get(relay))
        .route("/books/:book_id", get(relay).delete(relay))
        .route("/books/:book_id/chapters/:chapter/metadata", get(relay))
        .route("/books/:book_id/chapters/:chapter/audio", get(relay))
        .route("/books/:book_id/assets/:filename", get(relay))
        .route("/voices", get(relay))
        .route("/aligners", get(relay));

    Router::new().nest("/api", api)
}

/// 构建 Gateway Router（中间件与生成服务一致）
pub fn build_router(state: Arc<GatewayState>) -> Router {
    let max_upload_size = state.max_upload_size;
    with_common_layers(create_routes(), max_upload_size).with_state(state)
}

/// 转发 GET / DELETE
async fn relay(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let path = uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or_else(|| uri.path());
    state.upstream.relay(method, path, &headers).await
}

async fn spool_to_file(field: &mut Field<'_>, path: &Path, max_size: u64) -> Result<u64, GatewayError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written: u64 = 0;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| GatewayError::BadRequest(format!("Failed to read file: {}", e)))?
    {
        written += chunk.len() as u64;
        if written > max_size {
            return Err(GatewayError::BadRequest(format!(
                "File too large. Maximum size is {} MB",
                max_size / 1024 / 1024
            )));
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(written)
}

/// 创建有声书：暂存上传文件后流式转发
///
/// 暂存文件由 `TempPath` 持有，无论转发成功与否都会删除
async fn create_audiobook(
    State(state): State<Arc<GatewayState>>,
    OriginalUri(uri): OriginalUri,
    mut multipart: Multipart,
) -> Result<Response, GatewayError> {
    if !state.upstream.is_configured() {
        return Err(GatewayError::NotConfigured);
    }

    tokio::fs::create_dir_all(&state.temp_dir).await?;

    let mut fields = Vec::new();
    let mut upload: Option<(TempPath, String, String)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::BadRequest(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field
                .file_name()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| GatewayError::BadRequest("File name is required".to_string()))?;
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let suffix = Path::new(&file_name)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{}", e.to_lowercase()))
                .unwrap_or_default();

            let temp = tempfile::Builder::new()
                .prefix("gateway-")
                .suffix(&suffix)
                .tempfile_in(&state.temp_dir)?
                .into_temp_path();
            spool_to_file(&mut field, &temp, state.max_upload_size).await?;
            upload = Some((temp, file_name, content_type));
        } else if !name.is_empty() {
            let value = field
                .text()
                .await
                .map_err(|e| GatewayError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
            fields.push((name, value));
        }
    }

    let (temp, file_name, content_type) =
        upload.ok_or_else(|| GatewayError::BadRequest("No file provided".to_string()))?;

    state
        .upstream
        .upload(
            uri.path(),
            fields,
            UploadFile {
                path: &temp,
                file_name,
                content_type,
            },
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, Bytes};
    use axum::http::{header, Request, StatusCode};
    use axum::Json;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tokio::net::TcpListener;
    use tower::ServiceExt;

    const BOUNDARY: &str = "narrator-gateway-boundary";

    /// 本地上游：模拟生成服务
    async fn spawn_upstream() -> String {
        async fn books() -> Json<Value> {
            Json(json!([{"book_id": "moby-dick", "title": "Moby Dick"}]))
        }

        async fn audio() -> Response {
            let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
                Ok(Bytes::from_static(b"RIFF")),
                Ok(Bytes::from_static(b"WAVEdata")),
            ];
            Response::builder()
                .header(header::CONTENT_TYPE, "audio/wav")
                .header("x-chapter", "1")
                .body(Body::from_stream(futures_util::stream::iter(chunks)))
                .unwrap()
        }

        async fn broken_audio() -> Response {
            use futures_util::StreamExt;

            let head = futures_util::stream::once(async {
                Ok::<_, std::io::Error>(Bytes::from_static(b"RIFF"))
            });
            let failure = futures_util::stream::once(async {
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk vanished"))
            });
            Response::builder()
                .header(header::CONTENT_TYPE, "audio/wav")
                .body(Body::from_stream(head.chain(failure)))
                .unwrap()
        }

        /// 每 600ms 一块，总时长超过网关超时
        async fn slow_audio() -> Response {
            use futures_util::StreamExt;

            let chunks = futures_util::stream::iter(0u8..4).then(|i| async move {
                if i > 0 {
                    tokio::time::sleep(std::time::Duration::from_millis(600)).await;
                }
                Ok::<_, std::io::Error>(Bytes::from(vec![b'0' + i; 4]))
            });
            Response::builder()
                .header(header::CONTENT_TYPE, "audio/wav")
                .body(Body::from_stream(chunks))
                .unwrap()
        }

        async fn stalled_audio() -> Response {
            tokio::time::sleep(std::time::Duration::from_secs(3)).await;
            Response::new(Body::from("late"))
        }

        async fn missing_task() -> (StatusCode, Json<Value>) {
            (
                StatusCode::NOT_FOUND,
                Json(json!({"errno": 404, "error": "Job not found"})),
            )
        }

        async fn deleted() -> Json<Value> {
            Json(json!({"book_id": "moby-dick", "deleted": true}))
        }

        async fn submit(mut multipart: Multipart) -> (StatusCode, Json<Value>) {
            let mut voice = None;
            let mut file_name = None;
            let mut file_len = 0usize;
            while let Some(field) = multipart.next_field().await.unwrap() {
                let name = field.name().unwrap_or_default().to_string();
                match name.as_str() {
                    "voice" => voice = Some(field.text().await.unwrap()),
                    "file" => {
                        file_name = field.file_name().map(str::to_string);
                        file_len = field.bytes().await.unwrap().len();
                    }
                    _ => {}
                }
            }
            if voice.as_deref() == Some("robot") {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"errno": 400, "error": "unsupported voice: robot"})),
                );
            }
            (
                StatusCode::ACCEPTED,
                Json(json!({
                    "job_id": "00000000-0000-0000-0000-000000000001",
                    "book_id": "moby-dick",
                    "file_name": file_name,
                    "file_len": file_len,
                    "voice": voice,
                })),
            )
        }

        let app = Router::new()
            .route("/api/books", get(books))
            .route("/api/books/:book_id", axum::routing::delete(deleted))
            .route("/api/books/moby-dick/chapters/1/audio", get(audio))
            .route("/api/books/moby-dick/chapters/2/audio", get(broken_audio))
            .route("/api/books/moby-dick/chapters/3/audio", get(slow_audio))
            .route("/api/books/moby-dick/chapters/4/audio", get(stalled_audio))
            .route("/api/tasks/:job_id", get(missing_task))
            .route("/api/audiobooks", post(submit));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn gateway(base_url: Option<String>, temp_dir: &Path) -> Router {
        gateway_with_timeout(base_url, temp_dir, 10)
    }

    fn gateway_with_timeout(base_url: Option<String>, temp_dir: &Path, timeout_secs: u64) -> Router {
        let state = GatewayState {
            upstream: UpstreamClient::new(base_url, timeout_secs).unwrap(),
            temp_dir: temp_dir.to_path_buf(),
            max_upload_size: 64 * 1024,
        };
        build_router(Arc::new(state))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn upload_request(voice: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"voice\"\r\n\r\n{voice}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"Moby Dick.txt\"\r\nContent-Type: text/plain\r\n\r\n{content}\r\n\
             --{b}--\r\n",
            b = BOUNDARY,
            voice = voice,
            content = content
        );
        Request::builder()
            .method("POST")
            .uri("/api/audiobooks")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn dir_is_empty(path: &Path) -> bool {
        std::fs::read_dir(path).map(|mut d| d.next().is_none()).unwrap_or(true)
    }

    #[tokio::test]
    async fn test_ping_is_local() {
        let dir = TempDir::new().unwrap();
        let response = gateway(None, dir.path())
            .oneshot(get_request("/api/ping"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "pong");
    }

    #[tokio::test]
    async fn test_unconfigured_upstream_returns_503() {
        let dir = TempDir::new().unwrap();

        let response = gateway(None, dir.path())
            .oneshot(get_request("/api/books"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["errno"], 503);

        let response = gateway(None, dir.path())
            .oneshot(upload_request("af_heart", "Call me Ishmael."))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_relays_json_and_delete() {
        let dir = TempDir::new().unwrap();
        let base = spawn_upstream().await;

        let response = gateway(Some(base.clone()), dir.path())
            .oneshot(get_request("/api/books"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await[0]["book_id"], "moby-dick");

        let response = gateway(Some(base), dir.path())
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/books/moby-dick")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["deleted"], true);
    }

    #[tokio::test]
    async fn test_streams_audio_with_headers() {
        let dir = TempDir::new().unwrap();
        let base = spawn_upstream().await;

        let response = gateway(Some(base), dir.path())
            .oneshot(get_request("/api/books/moby-dick/chapters/1/audio"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/wav");
        assert_eq!(response.headers()["x-chapter"], "1");
        assert!(response.headers().get(header::TRANSFER_ENCODING).is_none());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"RIFFWAVEdata");
    }

    #[tokio::test]
    async fn test_mid_stream_failure_aborts_response() {
        let dir = TempDir::new().unwrap();
        let base = spawn_upstream().await;

        let response = gateway(Some(base), dir.path())
            .oneshot(get_request("/api/books/moby-dick/chapters/2/audio"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await;
        assert!(body.is_err());
    }

    #[tokio::test]
    async fn test_long_stream_outlives_response_timeout() {
        let dir = TempDir::new().unwrap();
        let base = spawn_upstream().await;

        let response = gateway_with_timeout(Some(base), dir.path(), 1)
            .oneshot(get_request("/api/books/moby-dick/chapters/3/audio"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"0000111122223333");
    }

    #[tokio::test]
    async fn test_missing_response_headers_time_out_with_504() {
        let dir = TempDir::new().unwrap();
        let base = spawn_upstream().await;

        let response = gateway_with_timeout(Some(base), dir.path(), 1)
            .oneshot(get_request("/api/books/moby-dick/chapters/4/audio"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(json_body(response).await["errno"], 504);
    }

    #[tokio::test]
    async fn test_upstream_error_status_and_body_passthrough() {
        let dir = TempDir::new().unwrap();
        let base = spawn_upstream().await;

        let response = gateway(Some(base), dir.path())
            .oneshot(get_request(
                "/api/tasks/00000000-0000-0000-0000-000000000009",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "Job not found");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_returns_502() {
        let dir = TempDir::new().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let response = gateway(Some(format!("http://{}", addr)), dir.path())
            .oneshot(get_request("/api/books"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["errno"], 502);
    }

    #[tokio::test]
    async fn test_upload_streams_file_and_removes_temp() {
        let dir = TempDir::new().unwrap();
        let base = spawn_upstream().await;
        let content = "# Moby Dick\n\n## Loomings\n\nCall me Ishmael.";

        let response = gateway(Some(base), dir.path())
            .oneshot(upload_request("af_heart", content))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = json_body(response).await;
        assert_eq!(body["book_id"], "moby-dick");
        assert_eq!(body["file_name"], "Moby Dick.txt");
        assert_eq!(body["file_len"], content.len());
        assert_eq!(body["voice"], "af_heart");
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_rejected_upload_still_removes_temp() {
        let dir = TempDir::new().unwrap();
        let base = spawn_upstream().await;

        let response = gateway(Some(base), dir.path())
            .oneshot(upload_request("robot", "Call me Ishmael."))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "unsupported voice: robot");
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected_and_removed() {
        let dir = TempDir::new().unwrap();
        let base = spawn_upstream().await;
        let content = "x".repeat(70 * 1024);

        let response = gateway(Some(base), dir.path())
            .oneshot(upload_request("af_heart", &content))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(dir_is_empty(dir.path()));
    }
}
