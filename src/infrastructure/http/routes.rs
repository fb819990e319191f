//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                                  GET     健康检查
//! - /api/audiobooks                            POST    提交生成任务（multipart，202）
//! - /api/tasks/:job_id                         GET     查询任务状态
//! - /api/books                                 GET     列出书籍
//! - /api/books/:book_id                        GET     书籍清单
//! - /api/books/:book_id                        DELETE  删除书籍
//! - /api/books/:book_id/chapters/:n/metadata   GET     章节元数据
//! - /api/books/:book_id/chapters/:n/audio      GET     章节音频（流式）
//! - /api/books/:book_id/assets/:filename       GET     资源下载（流式）
//! - /api/voices                                GET     可用音色
//! - /api/aligners                              GET     可用对齐后端

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/api", api_routes())
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/audiobooks", post(handlers::submit_audiobook))
        .route("/tasks/:job_id", get(handlers::get_task_status))
        .merge(book_routes())
        .route("/voices", get(handlers::list_voices))
        .route("/aligners", get(handlers::list_aligners))
}

/// Book 路由
fn book_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/books", get(handlers::list_books))
        .route(
            "/books/:book_id",
            get(handlers::get_book).delete(handlers::delete_book),
        )
        .route(
            "/books/:book_id/chapters/:chapter/metadata",
            get(handlers::get_chapter_metadata),
        )
        .route(
            "/books/:book_id/chapters/:chapter/audio",
            get(handlers::get_chapter_audio),
        )
        .route("/books/:book_id/assets/:filename", get(handlers::get_asset))
}

#[cfg(test)]
mod tests {
    use crate::application::{
        AlignerRegistry, AlignmentSelection, BookRepositoryPort, GenerationDefaults, JobRegistryPort,
        JobStatus,
    };
    use crate::domain::book::{AssetKind, Book, BookId, ChapterMetadata, ChapterSummary, Manifest};
    use crate::domain::timing::WordTiming;
    use crate::infrastructure::adapters::PlainTextParser;
    use crate::infrastructure::http::dto::{SubmitResponse, TaskStatusResponse, VoicesResponse};
    use crate::infrastructure::http::{build_router, AppState, UploadSettings};
    use crate::infrastructure::memory::InMemoryJobRegistry;
    use crate::infrastructure::persistence::{FileBookRepository, MANIFEST_FILE};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::mpsc;
    use tower::util::ServiceExt;
    use uuid::Uuid;

    const BOUNDARY: &str = "narrator-test-boundary";

    struct TestApp {
        _dir: TempDir,
        uploads: PathBuf,
        registry: Arc<InMemoryJobRegistry>,
        books: Arc<FileBookRepository>,
        router: Router,
        _rx: mpsc::Receiver<Uuid>,
    }

    impl TestApp {
        async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, bytes.to_vec())
        }

        async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
            self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
        }

        async fn delete(&self, uri: &str) -> (StatusCode, Vec<u8>) {
            self.send(
                Request::builder()
                    .method("DELETE")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
        }

        fn upload_count(&self) -> usize {
            std::fs::read_dir(&self.uploads)
                .map(|entries| entries.count())
                .unwrap_or(0)
        }
    }

    async fn app() -> TestApp {
        let dir = TempDir::new().unwrap();
        let uploads = dir.path().join("uploads");
        let (tx, rx) = mpsc::channel(16);
        let registry = InMemoryJobRegistry::new(tx).arc();
        let books = Arc::new(FileBookRepository::open(dir.path().join("books")).await.unwrap());

        let state = AppState::new(
            registry.clone(),
            books.clone(),
            Arc::new(PlainTextParser::new()),
            GenerationDefaults {
                voices: vec!["af_heart".into(), "bm_fable".into()],
                default_voice: "af_heart".into(),
                default_alignment: AlignmentSelection::Auto,
            },
            AlignerRegistry::new(),
            UploadSettings {
                dir: uploads.clone(),
                max_size: 64 * 1024,
            },
        );

        TestApp {
            _dir: dir,
            uploads,
            registry,
            books,
            router: build_router(Arc::new(state)),
            _rx: rx,
        }
    }

    fn multipart(fields: &[(&str, &str)], file: Option<(&str, &str)>) -> Request<Body> {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            ));
        }
        if let Some((filename, content)) = file {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: text/plain\r\n\r\n{}\r\n",
                BOUNDARY, filename, content
            ));
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));

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

    async fn publish_book(books: &FileBookRepository, id: &str) {
        let book_id = BookId::parse(id).unwrap();
        let staging = books.prepare(&book_id).await.unwrap();

        let metadata = ChapterMetadata {
            chapter_index: 1,
            chapter_title: "One".into(),
            audio_file: "0001_one.wav".into(),
            duration_ms: 500,
            text: "Hello world".into(),
            words: vec![
                WordTiming {
                    token: "Hello".into(),
                    start_ms: 0,
                    end_ms: 200,
                    char_start: 0,
                    char_end: 5,
                },
                WordTiming {
                    token: "world".into(),
                    start_ms: 200,
                    end_ms: 500,
                    char_start: 6,
                    char_end: 11,
                },
            ],
            book_title: Some("Test".into()),
            book_author: None,
        };
        std::fs::write(
            staging.join("0001_one.json"),
            serde_json::to_vec(&metadata).unwrap(),
        )
        .unwrap();
        std::fs::write(staging.join("0001_one.wav"), b"RIFF....WAVE").unwrap();

        let mut book = Book::new(book_id, "Test", None);
        let mut chapter = ChapterSummary::pending(1, "One");
        chapter.mark_ready(500, "0001_one.wav".into(), "0001_one.json".into());
        book.add_chapter(chapter);
        book.set_asset(AssetKind::Manifest, MANIFEST_FILE);
        books.publish(&staging, Manifest::new(book, None)).await.unwrap();
    }

    #[tokio::test]
    async fn test_ping() {
        let app = app().await;
        let (status, body) = app.get("/api/ping").await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("pong"));
    }

    #[tokio::test]
    async fn test_submit_returns_accepted_and_keeps_upload() {
        let app = app().await;
        let request = multipart(
            &[("voice", "bm_fable"), ("chapter_start", "1"), ("chapter_end", "2")],
            Some(("Moby Dick.txt", "Chapter 1\nCall me Ishmael.")),
        );

        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let submitted: SubmitResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(submitted.book_id, "moby-dick");
        assert_eq!(app.upload_count(), 1);

        let job = app.registry.get(submitted.job_id).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.request.voice, "bm_fable");

        let (status, body) = app.get(&format!("/api/tasks/{}", submitted.job_id)).await;
        assert_eq!(status, StatusCode::OK);
        let task: TaskStatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(task.status, "pending");
        assert!(!task.is_terminal());
    }

    #[tokio::test]
    async fn test_rejected_submission_removes_upload() {
        let app = app().await;

        let (status, _) = app
            .send(multipart(&[("voice", "robot")], Some(("book.txt", "text"))))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(multipart(
                &[("chapter_start", "3"), ("chapter_end", "1")],
                Some(("book.txt", "text")),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(multipart(&[("alignment_backend", "mfa")], Some(("book.txt", "text"))))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(app.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_or_oversized_file_is_bad_request() {
        let app = app().await;

        let (status, _) = app.send(multipart(&[("voice", "af_heart")], None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let large = "x".repeat(65 * 1024);
        let (status, _) = app.send(multipart(&[], Some(("big.txt", &large)))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(app.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_resources_are_not_found() {
        let app = app().await;
        assert_eq!(
            app.get(&format!("/api/tasks/{}", Uuid::new_v4())).await.0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(app.get("/api/books/nope").await.0, StatusCode::NOT_FOUND);
        assert_eq!(app.get("/api/books/NOT..VALID").await.0, StatusCode::NOT_FOUND);
        assert_eq!(
            app.get("/api/books/nope/chapters/1/metadata").await.0,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_delete_book_is_atomic_for_readers() {
        let app = app().await;
        publish_book(&app.books, "sample").await;

        let (status, body) = app.get("/api/books").await;
        assert_eq!(status, StatusCode::OK);
        let listed: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["book_id"], "sample");

        let (status, body) = app.get("/api/books/sample/chapters/1/metadata").await;
        assert_eq!(status, StatusCode::OK);
        let metadata: ChapterMetadata = serde_json::from_slice(&body).unwrap();
        assert_eq!(metadata.words.len(), 2);

        let (status, body) = app.get("/api/books/sample/chapters/1/audio").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"RIFF....WAVE");

        assert_eq!(app.delete("/api/books/sample").await.0, StatusCode::OK);

        let (_, body) = app.get("/api/books").await;
        let listed: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert!(listed.is_empty());
        assert_eq!(
            app.get("/api/books/sample/chapters/1/metadata").await.0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            app.get("/api/books/sample/chapters/1/audio").await.0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(app.delete("/api/books/sample").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_book_forgets_its_jobs() {
        let app = app().await;
        let (status, body) = app
            .send(multipart(&[], Some(("Sample.txt", "Chapter 1\nHello world."))))
            .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let submitted: SubmitResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(submitted.book_id, "sample");

        app.registry
            .transition(submitted.job_id, JobStatus::Completed)
            .unwrap();
        publish_book(&app.books, "sample").await;
        let task_uri = format!("/api/tasks/{}", submitted.job_id);
        assert_eq!(app.get(&task_uri).await.0, StatusCode::OK);

        assert_eq!(app.delete("/api/books/sample").await.0, StatusCode::OK);
        assert_eq!(app.get(&task_uri).await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_assets_limited_to_manifest_entries() {
        let app = app().await;
        publish_book(&app.books, "sample").await;

        assert_eq!(
            app.get("/api/books/sample/assets/manifest.json").await.0,
            StatusCode::OK
        );
        assert_eq!(
            app.get("/api/books/sample/assets/0001_one.json").await.0,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_catalog_endpoints() {
        let app = app().await;

        let (status, body) = app.get("/api/voices").await;
        assert_eq!(status, StatusCode::OK);
        let voices: VoicesResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(voices.voices, vec!["af_heart", "bm_fable"]);

        let (_, body) = app.get("/api/aligners").await;
        let aligners: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(aligners["aligners"][0], "auto");
        assert_eq!(aligners["aligners"][4], "heuristic");
    }
}
