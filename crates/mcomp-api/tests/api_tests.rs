//! API integration tests.

use std::io::Cursor;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderName, HeaderValue, Request, Response, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use mcomp_api::{create_router, ApiConfig, AppState};
use mcomp_media::MediaCapabilities;
use mcomp_models::JobId;

const BOUNDARY: &str = "mcomp-test-boundary";

struct TestApp {
    router: Router,
    state: AppState,
    _dir: TempDir,
}

async fn test_app_with(configure: impl FnOnce(&mut ApiConfig)) -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut config = ApiConfig {
        upload_dir: dir.path().join("uploads"),
        download_dir: dir.path().join("downloads"),
        cleanup_enabled: false,
        ..Default::default()
    };
    configure(&mut config);
    config.ensure_dirs().await.unwrap();

    let capabilities = MediaCapabilities {
        ffmpeg_available: false,
        heic_support: false,
    };
    let state = AppState::new(config, capabilities);
    TestApp {
        router: create_router(state.clone(), None),
        state,
        _dir: dir,
    }
}

async fn test_app() -> TestApp {
    test_app_with(|_| {}).await
}

#[derive(Clone, Copy)]
enum Part<'a> {
    File(&'a str, &'a [u8]),
    Text(&'a str, &'a str),
}

fn multipart_request(parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File(filename, data) => {
                let disposition = format!(
                    "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    filename
                );
                body.extend_from_slice(disposition.as_bytes());
                body.extend_from_slice(data);
            }
            Part::Text(name, value) => {
                let disposition = format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                    name, value
                );
                body.extend_from_slice(disposition.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let content_type = format!("multipart/form-data; boundary={}", BOUNDARY);
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// GET as seen behind the reverse proxy for client `ip`.
fn from_client(uri: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-real-ip", ip)
        .body(Body::empty())
        .unwrap()
}

async fn respond(app: &TestApp, request: Request<Body>) -> Response<Body> {
    app.router.clone().oneshot(request).await.unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = respond(app, request).await;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn header_str(response: &Response<Body>, name: HeaderName) -> String {
    response.headers()[name].to_str().unwrap().to_string()
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([30, 120, 200, 128]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

async fn upload_png(app: &TestApp, name: &str, extra: &[Part<'_>]) -> String {
    let data = png_bytes(64, 32);
    let mut parts = vec![Part::File(name, &data)];
    parts.extend(extra.iter().copied());

    let (status, body) = send_json(app, multipart_request(&parts)).await;
    assert_eq!(status, StatusCode::OK, "upload failed: {}", body);
    body["job_id"].as_str().unwrap().to_string()
}

async fn wait_for_terminal(app: &TestApp, job_id: &str) -> Value {
    for _ in 0..200 {
        let (status, body) = send_json(app, get(&format!("/job/{}", job_id))).await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] == "completed" || body["status"] == "failed" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {} never finished", job_id);
}

fn dir_is_empty(path: &std::path::Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app().await;
    let (status, body) = send_json(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["ffmpeg_available"], false);
    assert_eq!(body["heic_support"], false);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_index_page() {
    let app = test_app().await;
    let (status, body) = send(&app, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("Media Compressor"));
    assert!(html.contains("Max upload: 500 MB"));
    assert!(!html.contains("{{"));
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = test_app().await;
    let response = respond(&app, get("/jobs")).await;

    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_upload_and_compress_png_to_jpg() {
    let app = test_app().await;
    let job_id = upload_png(&app, "photo.png", &[]).await;
    assert_eq!(job_id.len(), 8);

    let job = wait_for_terminal(&app, &job_id).await;
    assert_eq!(job["status"], "completed", "job failed: {}", job);
    assert_eq!(job["progress"], 100);
    assert_eq!(job["preset"], "facebook");
    assert_eq!(job["image_format"], "jpg");
    assert_eq!(job["original_filename"], "photo.png");
    assert_eq!(job["download_ready"], true);
    let output_name = job["output_filename"].as_str().unwrap();
    assert!(output_name.ends_with("_photo.jpg"));

    let response = respond(&app, get(&format!("/download/{}", job_id))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = header_str(&response, header::CONTENT_TYPE);
    assert_eq!(content_type, "application/octet-stream");
    let disposition = header_str(&response, header::CONTENT_DISPOSITION);
    assert!(disposition.starts_with("attachment; filename=compressed_"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn test_upload_with_png_output_and_preset() {
    let app = test_app().await;
    let options = [
        Part::Text("preset", "aggressive"),
        Part::Text("image_format", "png"),
    ];
    let job_id = upload_png(&app, "icon.png", &options).await;

    let job = wait_for_terminal(&app, &job_id).await;
    assert_eq!(job["status"], "completed", "job failed: {}", job);
    assert_eq!(job["preset"], "aggressive");
    assert!(job["output_filename"].as_str().unwrap().ends_with(".png"));
}

#[tokio::test]
async fn test_upload_unsupported_type() {
    let app = test_app().await;
    let request = multipart_request(&[Part::File("notes.txt", b"hello")]);
    let (status, body) = send_json(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Unsupported file type: .txt"));
    assert!(dir_is_empty(&app.state.config.upload_dir));
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let app = test_app().await;
    let request = multipart_request(&[Part::Text("preset", "balanced")]);
    let (status, _) = send_json(&app, request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_upload_empty_filename() {
    let app = test_app().await;
    let request = multipart_request(&[Part::File("", b"data")]);
    let (status, body) = send_json(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No file provided");
}

#[tokio::test]
async fn test_upload_unknown_preset_removes_file() {
    let app = test_app().await;
    let data = png_bytes(8, 8);
    let parts = [Part::File("a.png", &data), Part::Text("preset", "tiktok")];
    let (status, body) = send_json(&app, multipart_request(&parts)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("tiktok"));
    assert!(dir_is_empty(&app.state.config.upload_dir));
    assert!(app.state.jobs.is_empty().await);
}

#[tokio::test]
async fn test_upload_too_large() {
    let app = test_app_with(|c| c.max_upload_size_mb = 1).await;
    let data = vec![0u8; 1024 * 1024 + 512 * 1024];
    let request = multipart_request(&[Part::File("big.mp4", &data)]);
    let (status, body) = send_json(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "File too large. Maximum size is 1MB");
    assert!(dir_is_empty(&app.state.config.upload_dir));
}

#[tokio::test]
async fn test_oversized_content_length_is_rejected_as_json() {
    let app = test_app_with(|c| c.max_upload_size_mb = 1).await;
    let mut request = multipart_request(&[Part::File("small.png", b"tiny")]);
    // Refused on the declared length alone, before the body is read
    let declared = HeaderValue::from(10 * 1024 * 1024_u64);
    let headers = request.headers_mut();
    headers.insert(header::CONTENT_LENGTH, declared);

    let (status, body) = send_json(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "File too large. Maximum size is 1MB");
    assert!(dir_is_empty(&app.state.config.upload_dir));
    assert!(app.state.jobs.is_empty().await);
}

#[tokio::test]
async fn test_unknown_job_is_404() {
    let app = test_app().await;
    let requests = [
        get("/job/nope"),
        delete("/job/nope"),
        get("/download/nope"),
        get("/thumbnail/nope"),
    ];

    for request in requests {
        let (status, body) = send_json(&app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Job not found");
    }
}

#[tokio::test]
async fn test_download_not_ready() {
    let app = test_app().await;
    let path = app.state.config.upload_dir.join("0000aaaa_clip.mp4");
    tokio::fs::write(&path, b"not a video").await.unwrap();
    let job = app
        .state
        .jobs
        .create_job("clip.mp4", &path, Default::default(), Default::default())
        .await
        .unwrap();

    let (status, body) = send_json(&app, get(&format!("/download/{}", job.id))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "File not ready for download");
}

#[tokio::test]
async fn test_download_after_output_removed_is_404() {
    let app = test_app().await;
    let job_id = upload_png(&app, "gone.png", &[]).await;
    let job = wait_for_terminal(&app, &job_id).await;
    assert_eq!(job["status"], "completed", "job failed: {}", job);

    let id = JobId::from_string(job_id.clone());
    let stored = app.state.jobs.get_job(&id).await.unwrap();
    let output = stored.compressed_path.unwrap();
    tokio::fs::remove_file(&output).await.unwrap();

    let (status, body) = send_json(&app, get(&format!("/download/{}", job_id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Compressed file not found");
}

#[tokio::test]
async fn test_download_all_without_completed_jobs() {
    let app = test_app().await;
    let (status, body) = send_json(&app, get("/download-all")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No completed files to download");
}

#[tokio::test]
async fn test_download_all_returns_zip() {
    let app = test_app().await;
    let first = upload_png(&app, "one.png", &[]).await;
    let second = upload_png(&app, "two.png", &[]).await;
    wait_for_terminal(&app, &first).await;
    wait_for_terminal(&app, &second).await;

    let response = respond(&app, get("/download-all")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = header_str(&response, header::CONTENT_TYPE);
    assert_eq!(content_type, "application/zip");
    let disposition = header_str(&response, header::CONTENT_DISPOSITION);
    assert!(disposition.starts_with("attachment; filename=compressed_"));
    assert!(disposition.ends_with(".zip"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    assert_eq!(archive.len(), 2);
}

#[tokio::test]
async fn test_list_delete_and_clear_jobs() {
    let app = test_app().await;
    let first = upload_png(&app, "a.png", &[]).await;
    let second = upload_png(&app, "b.png", &[]).await;
    wait_for_terminal(&app, &first).await;
    wait_for_terminal(&app, &second).await;

    let (status, body) = send_json(&app, get("/jobs")).await;
    assert_eq!(status, StatusCode::OK);
    let jobs = body["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["id"], second.as_str());

    let (status, body) = send_json(&app, delete(&format!("/job/{}", first))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Job deleted");
    let (status, _) = send_json(&app, get(&format!("/job/{}", first))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send_json(&app, delete("/jobs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], 1);
    assert_eq!(body["message"], "Cleared 1 jobs");

    assert!(dir_is_empty(&app.state.config.upload_dir));
    assert!(dir_is_empty(&app.state.config.download_dir));
}

#[tokio::test]
async fn test_thumbnail_for_image() {
    let app = test_app().await;
    let job_id = upload_png(&app, "wide.png", &[]).await;

    let response = respond(&app, get(&format!("/thumbnail/{}", job_id))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_TYPE), "image/jpeg");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let thumb = image::load_from_memory(&bytes).unwrap();
    assert!(thumb.width() <= 200 && thumb.height() <= 200);
}

#[tokio::test]
async fn test_rate_limiting() {
    let app = test_app_with(|c| c.rate_limit_rps = 2).await;

    let mut limited = None;
    for _ in 0..5 {
        let (status, body) = send_json(&app, from_client("/jobs", "192.168.1.100")).await;
        if status == StatusCode::TOO_MANY_REQUESTS {
            limited = Some(body);
            break;
        }
    }
    let body = limited.expect("client was never rate limited");
    assert_eq!(
        body["detail"],
        "Rate limit exceeded. Please try again later."
    );

    // A different client still has its own quota
    let (status, _) = send(&app, from_client("/jobs", "192.168.1.101")).await;
    assert_eq!(status, StatusCode::OK);

    // Health checks are never limited
    let (status, _) = send(&app, from_client("/health", "192.168.1.100")).await;
    assert_eq!(status, StatusCode::OK);
}
