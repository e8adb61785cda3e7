//! Multipart upload handler.

use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use mcomp_models::job::short_id;
use mcomp_models::{dotted_extension, is_allowed_upload, ImageFormat, MediaKind, Preset};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::spawn_compression;
use crate::state::AppState;

const SUPPORTED_TYPES: &str =
    "images (jpg, png, heic, webp, gif) and videos (mp4, mov, avi, mkv, webm)";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub job_id: String,
    pub message: String,
}

/// An upload written to disk but not yet registered as a job.
#[derive(Debug)]
struct StoredUpload {
    filename: String,
    path: PathBuf,
    size: u64,
}

#[derive(Debug, Default)]
struct UploadForm {
    file: Option<StoredUpload>,
    preset: Option<String>,
    image_format: Option<String>,
}

/// Accept a file and start compressing it in the background.
///
/// Fields: `file` (required), `preset` (default `facebook`), `image_format` (default `jpg`).
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut form = UploadForm::default();
    if let Err(e) = read_form(&state, &mut multipart, &mut form).await {
        if let Some(upload) = form.file.take() {
            discard(&upload.path).await;
        }
        return Err(e);
    }

    let upload = form
        .file
        .take()
        .ok_or_else(|| ApiError::unprocessable("Missing required field: file"))?;

    let job = match register_job(&state, &upload, &form).await {
        Ok(job) => job,
        Err(e) => {
            discard(&upload.path).await;
            return Err(e);
        }
    };

    let kind = MediaKind::from_path(&upload.path)
        .map(|k| k.as_str())
        .unwrap_or("unknown");
    metrics::record_upload_bytes(upload.size);
    metrics::record_job_created(kind);
    info!(
        job_id = %job.id,
        filename = %upload.filename,
        size = upload.size,
        preset = %job.preset,
        "Upload accepted"
    );

    let job_id = job.id.to_string();
    spawn_compression(state, job.id);

    Ok(Json(UploadResponse {
        job_id,
        message: "Upload successful, processing started".to_string(),
    }))
}

async fn read_form(
    state: &AppState,
    multipart: &mut Multipart,
    form: &mut UploadForm,
) -> ApiResult<()> {
    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") if form.file.is_none() => {
                form.file = Some(store_upload(state, field).await?);
            }
            Some("preset") => form.preset = Some(field.text().await?),
            Some("image_format") => form.image_format = Some(field.text().await?),
            _ => {}
        }
    }
    Ok(())
}

async fn register_job(
    state: &AppState,
    upload: &StoredUpload,
    form: &UploadForm,
) -> ApiResult<mcomp_models::CompressionJob> {
    let preset: Preset = parse_option(form.preset.as_deref())?;
    let image_format: ImageFormat = parse_option(form.image_format.as_deref())?;

    Ok(state
        .jobs
        .create_job(&upload.filename, &upload.path, preset, image_format)
        .await?)
}

/// Blank or absent values fall back to the default.
fn parse_option<T>(raw: Option<&str>) -> ApiResult<T>
where
    T: std::str::FromStr + Default,
    ApiError: From<T::Err>,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => Ok(value.parse()?),
        None => Ok(T::default()),
    }
}

async fn store_upload(state: &AppState, mut field: Field<'_>) -> ApiResult<StoredUpload> {
    let filename = sanitize_filename(field.file_name().unwrap_or_default());
    if filename.is_empty() {
        return Err(ApiError::bad_request("No file provided"));
    }

    let ext = dotted_extension(Path::new(&filename)).unwrap_or_default();
    if !is_allowed_upload(&ext) {
        return Err(ApiError::bad_request(format!(
            "Unsupported file type: {}. Supported: {}",
            ext, SUPPORTED_TYPES
        )));
    }

    let stored_name = format!("{}_{}", short_id(), filename);
    let path = state.config.upload_dir.join(stored_name);
    match write_field(&mut field, &path, state).await {
        Ok(size) => Ok(StoredUpload {
            filename,
            path,
            size,
        }),
        Err(e) => {
            discard(&path).await;
            Err(e)
        }
    }
}

async fn write_field(field: &mut Field<'_>, path: &Path, state: &AppState) -> ApiResult<u64> {
    let limit = state.config.max_upload_bytes();
    let max_mb = state.config.max_upload_size_mb;

    let mut file = tokio::fs::File::create(path).await?;
    let mut written: u64 = 0;

    while let Some(chunk) = field.chunk().await.map_err(|e| chunk_error(e, max_mb))? {
        written += chunk.len() as u64;
        if written > limit {
            return Err(ApiError::file_too_large(max_mb));
        }
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    Ok(written)
}

/// A body cut off by the request size limit is reported as an oversized file.
fn chunk_error(e: MultipartError, max_upload_mb: u64) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::file_too_large(max_upload_mb)
    } else {
        e.into()
    }
}

/// Keep only the final path component of a client-supplied name.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    base.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .trim_start_matches('.')
        .to_string()
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), "Failed to remove rejected upload: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd.png"), "passwd.png");
        assert_eq!(sanitize_filename("C:\\Users\\me\\clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_filename("..hidden.gif"), "hidden.gif");
        assert_eq!(sanitize_filename(""), "");
        assert_eq!(sanitize_filename("dir/"), "");
    }

    #[test]
    fn test_parse_option_defaults() {
        let preset: Preset = parse_option(None).unwrap();
        assert_eq!(preset, Preset::Facebook);
        let format: ImageFormat = parse_option(Some("  ")).unwrap();
        assert_eq!(format, ImageFormat::Jpg);
        let preset: Preset = parse_option(Some("Aggressive")).unwrap();
        assert_eq!(preset, Preset::Aggressive);
        assert!(parse_option::<Preset>(Some("tiktok")).is_err());
    }
}
