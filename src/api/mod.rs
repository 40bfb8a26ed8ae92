//! HTTP surface: the list page, the edit page and the health probe.

pub mod common;
pub mod edit;
pub mod list;
pub mod render;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use time::Duration;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::api::common::http_trace::{make_request_span, on_failure, on_request, on_response};
use crate::system::health_check::health_check;
use crate::InnerState;

/// Builds the application router with sessions, tracing and the upload limit applied.
#[tracing::instrument(name = "create_router", skip(state))]
pub fn create_router(state: InnerState) -> Router {
    tracing::info!("Creating video admin router");

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(Duration::hours(12)));

    Router::new()
        .route("/", get(list::list_videos_page))
        .route("/:id", get(edit::edit_form).post(edit::apply_edit))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(make_request_span::<axum::body::Body>)
                .on_request(on_request::<axum::body::Body>)
                .on_response(on_response::<axum::body::Body>)
                .on_failure(on_failure),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::testing::memory_pool;
    use crate::videos::paths::AssetPaths;
    use crate::videos::repository::{get_video, insert_video};
    use crate::videos::{sample_video, Video};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration as StdDuration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "XxVideoAdminBoundaryxX";
    const TIMEOUT: StdDuration = StdDuration::from_secs(5);

    struct Harness {
        state: InnerState,
        root: tempfile::TempDir,
    }

    impl Harness {
        async fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let config = AppConfig {
                base_site_url: "https://host/".into(),
                fs_root: root.path().to_path_buf(),
                database_url: "sqlite::memory:".into(),
                bind_addr: "127.0.0.1:0".into(),
                max_upload_bytes: 16 * 1024 * 1024,
                query_timeout: TIMEOUT,
            };
            let state = InnerState {
                db: memory_pool().await,
                paths: AssetPaths::from_config(&config),
                config: Arc::new(config),
            };
            Self { state, root }
        }

        fn file(&self, relative: &str) -> PathBuf {
            self.root.path().join(relative)
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
            let response = create_router(self.state.clone())
                .oneshot(request)
                .await
                .unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, String::from_utf8_lossy(&bytes).into_owned())
        }

        async fn post(&self, id: i64, parts: &[Part<'_>]) -> (StatusCode, String) {
            let request = Request::builder()
                .method("POST")
                .uri(format!("/{id}"))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(parts)))
                .unwrap();
            self.send(request).await
        }

        async fn get(&self, uri: &str) -> (StatusCode, String) {
            self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
        }

        async fn video(&self, id: i64) -> Option<Video> {
            get_video(&self.state.db, TIMEOUT, id).await.ok()
        }
    }

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, file_name, contents) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(contents);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn write(path: &Path, contents: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn health_pings_database() {
        let h = Harness::new().await;
        let (status, body) = h.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn list_ignores_non_numeric_integer_filter() {
        let h = Harness::new().await;
        insert_video(&h.state.db, &sample_video(1, "https://host/a/one.mp4")).await;
        insert_video(&h.state.db, &sample_video(2, "https://host/a/two.mp4")).await;

        let (status, body) = h.get("/?field=clicks&q=abc").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("2 record(s)"));
        assert!(body.contains("href=\"/1\""));
        assert!(body.contains("href=\"/2\""));
    }

    #[tokio::test]
    async fn list_shows_duplicate_groups() {
        let h = Harness::new().await;
        let mut older = sample_video(1, "https://host/a/one.mp4");
        older.video_id = "X1".into();
        older.created_at = "2024-01-01 00:00:00".into();
        let mut newer = sample_video(2, "https://host/a/two.mp4");
        newer.video_id = "X1".into();
        newer.created_at = "2024-06-01 00:00:00".into();
        insert_video(&h.state.db, &older).await;
        insert_video(&h.state.db, &newer).await;
        insert_video(&h.state.db, &sample_video(3, "https://host/a/three.mp4")).await;

        let (status, body) = h.get("/?duplicates=1").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Duplicates (1 group(s))"));
        assert!(body.contains("<h3>X1</h3>"));
        let newer_at = body.find("href=\"/2\"").unwrap();
        let older_at = body.find("href=\"/1\"").unwrap();
        assert!(newer_at < older_at);
        assert!(!body.contains("href=\"/3\""));
    }

    #[tokio::test]
    async fn edit_page_for_missing_record_is_404() {
        let h = Harness::new().await;
        let (status, _) = h.get("/404").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_missing_file_redirects_without_error() {
        let h = Harness::new().await;
        insert_video(&h.state.db, &sample_video(1, "https://host/a/b/video.mp4")).await;

        let (status, _) = h.post(1, &[Part::Text("delete_audio", "1")]).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert!(h.video(1).await.is_some());
    }

    #[tokio::test]
    async fn deleting_thumbnail_clears_thumb_url() {
        let h = Harness::new().await;
        let mut video = sample_video(1, "https://host/a/b/video.mp4");
        video.thumb_url = Some("https://host/a/b/video.jpg".into());
        insert_video(&h.state.db, &video).await;
        write(&h.file("a/b/video.jpg"), b"jpeg");

        let (status, _) = h.post(1, &[Part::Text("delete_thumb", "1")]).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert!(!h.file("a/b/video.jpg").exists());
        assert_eq!(h.video(1).await.unwrap().thumb_url, None);
    }

    #[tokio::test]
    async fn delete_all_removes_files_and_row() {
        let h = Harness::new().await;
        insert_video(&h.state.db, &sample_video(1, "https://host/a/b/video.mp4")).await;
        for ext in ["mp4", "mp3", "jpg", "json"] {
            write(&h.file(&format!("a/b/video.{ext}")), b"data");
        }

        let (status, _) = h.post(1, &[Part::Text("delete_all", "1")]).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        for ext in ["mp4", "mp3", "vtt", "jpg", "json"] {
            assert!(!h.file(&format!("a/b/video.{ext}")).exists());
        }
        assert!(h.video(1).await.is_none());
    }

    #[tokio::test]
    async fn delete_db_only_leaves_files_untouched() {
        let h = Harness::new().await;
        insert_video(&h.state.db, &sample_video(1, "https://host/a/b/video.mp4")).await;
        write(&h.file("a/b/video.mp4"), b"video bytes");
        write(&h.file("a/b/video.json"), b"{\"keep\": true}");

        let (status, _) = h.post(1, &[Part::Text("delete_db_only", "1")]).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert!(h.video(1).await.is_none());
        assert_eq!(std::fs::read(h.file("a/b/video.mp4")).unwrap(), b"video bytes");
        assert_eq!(std::fs::read(h.file("a/b/video.json")).unwrap(), b"{\"keep\": true}");
    }

    #[tokio::test]
    async fn delete_button_wins_over_uploads() {
        let h = Harness::new().await;
        insert_video(&h.state.db, &sample_video(1, "https://host/a/b/video.mp4")).await;
        write(&h.file("a/b/video.mp4"), b"old");

        let (status, _) = h
            .post(
                1,
                &[
                    Part::Text("vid_title", "Ignored"),
                    Part::File("audio_file", "new.mp3", b"audio"),
                    Part::Text("delete_video", "1"),
                ],
            )
            .await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert!(!h.file("a/b/video.mp4").exists());
        assert!(!h.file("a/b/video.mp3").exists());
        assert_eq!(h.video(1).await.unwrap().vid_title, "Sunday Service Title");
    }

    #[tokio::test]
    async fn save_updates_metadata_and_creates_sidecar() {
        let h = Harness::new().await;
        insert_video(&h.state.db, &sample_video(1, "https://host/a/b/video.mp4")).await;

        let (status, _) = h
            .post(
                1,
                &[
                    Part::Text("vid_title", "Renamed"),
                    Part::Text("clicks", "17"),
                    Part::File("video_file", "", b""),
                ],
            )
            .await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        let saved = h.video(1).await.unwrap();
        assert_eq!(saved.vid_title, "Renamed");
        assert_eq!(saved.clicks, 17);
        assert!(!h.file("a/b/video.mp4").exists());

        let sidecar = read_json(&h.file("a/b/video.json"));
        assert_eq!(sidecar["sql_params"], Value::Object(saved.field_map()));
        assert_eq!(sidecar["uploader"], "Pastor Jones");
    }

    #[tokio::test]
    async fn json_upload_overwrites_fields_but_not_id() {
        let h = Harness::new().await;
        insert_video(&h.state.db, &sample_video(1, "https://host/a/b/video.mp4")).await;
        let upload = json!({
            "uploader": "Ingest Bot",
            "sql_params": {"id": 77, "vid_title": "From JSON", "language": "es", "bogus": 1}
        })
        .to_string();

        let (status, _) = h
            .post(1, &[Part::File("json_file", "video.json", upload.as_bytes())])
            .await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        let saved = h.video(1).await.unwrap();
        assert_eq!(saved.id, 1);
        assert_eq!(saved.vid_title, "From JSON");
        assert_eq!(saved.language, "es");
        assert!(h.video(77).await.is_none());

        let sidecar = read_json(&h.file("a/b/video.json"));
        assert_eq!(sidecar["uploader"], "Ingest Bot");
        assert_eq!(sidecar["sql_params"], Value::Object(saved.field_map()));
    }

    #[tokio::test]
    async fn uploads_write_files_and_set_thumb_url() {
        let h = Harness::new().await;
        insert_video(&h.state.db, &sample_video(1, "https://host/a/b/video.mp4")).await;
        write(&h.file("a/b/video.vtt"), b"WEBVTT old");
        write(&h.file("a/b/video.mp3"), b"a very long previous audio payload");

        let (status, _) = h
            .post(
                1,
                &[
                    Part::File("thumb_file", "t.jpg", b"jpeg"),
                    Part::File("video_file", "v.mp4", b"mp4"),
                    Part::File("audio_file", "a.mp3", b"mp3"),
                    Part::Text("vtt_delete", "true"),
                ],
            )
            .await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        assert_eq!(std::fs::read(h.file("a/b/video.jpg")).unwrap(), b"jpeg");
        assert_eq!(std::fs::read(h.file("a/b/video.mp4")).unwrap(), b"mp4");
        assert_eq!(std::fs::read(h.file("a/b/video.mp3")).unwrap(), b"mp3");
        assert!(!h.file("a/b/video.vtt").exists());
        assert_eq!(
            h.video(1).await.unwrap().thumb_url.as_deref(),
            Some("https://host/a/b/video.jpg")
        );
    }

    #[tokio::test]
    async fn failed_save_rerenders_form_with_error() {
        let h = Harness::new().await;
        insert_video(&h.state.db, &sample_video(1, "https://host/a/b/video.mp4")).await;

        let (status, body) = h
            .post(
                1,
                &[Part::File("json_file", "video.json", b"{ not json")],
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<li class=\"error\">Error during form validation or file operations"));
        assert!(body.contains("<form method=\"post\" action=\"/1\""));
        // the upload was written before parsing failed and is not rolled back
        assert_eq!(std::fs::read(h.file("a/b/video.json")).unwrap(), b"{ not json");
        assert_eq!(h.video(1).await.unwrap().vid_title, "Sunday Service Title");
    }

    #[tokio::test]
    async fn json_upload_that_is_not_an_object_stops_before_row_save() {
        let h = Harness::new().await;
        insert_video(&h.state.db, &sample_video(1, "https://host/a/b/video.mp4")).await;

        let (status, body) = h
            .post(
                1,
                &[
                    Part::Text("vid_title", "Should Not Persist"),
                    Part::File("json_file", "video.json", b"[1,2]"),
                ],
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("uploaded JSON must be an object"));
        assert!(!body.contains("Database updated from uploaded JSON."));
        assert!(!body.contains("Database changes saved successfully."));
        assert_eq!(h.video(1).await.unwrap().vid_title, "Sunday Service Title");
        assert_eq!(std::fs::read(h.file("a/b/video.json")).unwrap(), b"[1,2]");
    }

    #[tokio::test]
    async fn json_upload_with_non_object_sql_params_is_rejected() {
        let h = Harness::new().await;
        insert_video(&h.state.db, &sample_video(1, "https://host/a/b/video.mp4")).await;

        let (status, body) = h
            .post(
                1,
                &[Part::File("json_file", "video.json", br#"{"sql_params": "nope"}"#)],
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("sql_params in uploaded JSON must be an object"));
        assert_eq!(h.video(1).await.unwrap().vid_title, "Sunday Service Title");
    }

    #[tokio::test]
    async fn url_outside_base_fails_save_without_touching_disk() {
        let h = Harness::new().await;
        insert_video(&h.state.db, &sample_video(1, "https://elsewhere/video.mp4")).await;

        let (status, body) = h
            .post(1, &[Part::File("video_file", "v.mp4", b"mp4")])
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("does not start with base url"));
        assert_eq!(std::fs::read_dir(h.root.path()).unwrap().count(), 0);
    }
}
