//! Download handlers for compressed outputs.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::PathBuf;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use chrono::Local;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use mcomp_models::JobId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Stream one compressed file as an attachment.
pub async fn download_file(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let job = state
        .jobs
        .get_job(&JobId::from_string(job_id))
        .await
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    let path = match (&job.compressed_path, job.is_download_ready()) {
        (Some(path), true) => path.clone(),
        _ => return Err(ApiError::bad_request("File not ready for download")),
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found("Compressed file not found"));
        }
        Err(e) => return Err(e.into()),
    };
    let len = file.metadata().await?.len();
    let filename = job
        .output_filename()
        .unwrap_or_else(|| "download".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (header::CONTENT_DISPOSITION, attachment(&filename)),
            (header::CONTENT_LENGTH, HeaderValue::from(len)),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

/// Bundle every completed output into a ZIP archive.
pub async fn download_all(State(state): State<AppState>) -> ApiResult<Response> {
    let files: Vec<PathBuf> = state
        .jobs
        .completed_jobs()
        .await
        .into_iter()
        .filter_map(|job| job.compressed_path)
        .collect();

    if files.is_empty() {
        return Err(ApiError::bad_request("No completed files to download"));
    }

    let archive = tokio::task::spawn_blocking(move || build_archive(&files))
        .await
        .map_err(|e| ApiError::internal(format!("Archive task failed: {}", e)))??;

    let filename = format!("compressed_{}.zip", Local::now().format("%Y%m%d_%H%M"));
    info!(filename = %filename, bytes = archive.len(), "Serving archive");

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (header::CONTENT_DISPOSITION, attachment(&filename)),
        ],
        archive,
    )
        .into_response())
}

/// Deflate the files that still exist; entries are named by file name.
fn build_archive(files: &[PathBuf]) -> std::io::Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut used = HashSet::new();

    for path in files {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                warn!(path = %path.display(), "Skipping file in archive: {}", e);
                continue;
            }
        };
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };

        let name = unique_entry_name(&name, &mut used);
        zip.start_file(name, options)
            .map_err(std::io::Error::other)?;
        zip.write_all(&data)?;
    }

    let cursor = zip.finish().map_err(std::io::Error::other)?;
    Ok(cursor.into_inner())
}

/// `name`, or `name (n).ext` when an entry with that name already exists.
fn unique_entry_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{}", ext)),
        _ => (name, String::new()),
    };
    let mut n = 1;
    loop {
        let candidate = format!("{} ({}){}", stem, n, ext);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// `Content-Disposition` value with an RFC 5987 fallback for non-ASCII names.
fn attachment(filename: &str) -> HeaderValue {
    let plain = filename.is_ascii() && !filename.contains(['"', '\\']);
    let value = if plain {
        format!("attachment; filename={}", filename)
    } else {
        format!(
            "attachment; filename*=UTF-8''{}",
            urlencoding::encode(filename)
        )
    };
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
