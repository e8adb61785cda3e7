//! Job registry integration tests.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use mcomp_jobs::{remove_job_files, JobManager};
use mcomp_models::{CompressionJob, ImageFormat, JobStatus, Preset};
use tempfile::TempDir;

async fn write_file(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    tokio::fs::write(&path, b"0123456789").await.unwrap();
    path
}

async fn create_job(manager: &JobManager, dir: &TempDir, name: &str) -> CompressionJob {
    let path = write_file(dir, name).await;
    manager
        .create_job(name, &path, Preset::Facebook, ImageFormat::Jpg)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_list_jobs_newest_first() {
    let dir = TempDir::new().unwrap();
    let manager = JobManager::new();

    let mut ids = Vec::new();
    for i in 0..3 {
        let job = create_job(&manager, &dir, &format!("f{}.jpg", i)).await;
        // Spread creation times so ordering is deterministic
        let at = Utc::now() - chrono::Duration::seconds(10 - i);
        manager.update_job(&job.id, |j| j.created_at = at).await;
        ids.push(job.id);
    }

    let views = manager.list_jobs().await;
    let listed: Vec<_> = views.into_iter().map(|v| v.id).collect();
    assert_eq!(listed, vec![ids[2].clone(), ids[1].clone(), ids[0].clone()]);
}

#[tokio::test]
async fn test_update_and_completed_jobs() {
    let dir = TempDir::new().unwrap();
    let manager = JobManager::new();
    let a = create_job(&manager, &dir, "a.jpg").await;
    let b = create_job(&manager, &dir, "b.jpg").await;

    let output = write_file(&dir, "compressed_a.jpg").await;
    assert!(manager.update_job(&a.id, |j| j.complete(&output, 4)).await);
    assert!(manager.update_job(&b.id, |j| j.fail("bad input")).await);

    let done = manager.completed_jobs().await;
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].id, a.id);

    let failed = manager.get_job(&b.id).await.unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.view().compression_ratio, None);

    let completed = manager.get_job(&a.id).await.unwrap();
    assert_eq!(completed.view().compression_ratio, Some(60.0));
}

#[tokio::test]
async fn test_delete_and_clear() {
    let dir = TempDir::new().unwrap();
    let manager = JobManager::new();
    for i in 0..3 {
        create_job(&manager, &dir, &format!("c{}.png", i)).await;
    }
    let first = manager.list_jobs().await[0].id.clone();

    assert!(manager.delete_job(&first).await.is_some());
    assert!(manager.delete_job(&first).await.is_none());
    assert_eq!(manager.len().await, 2);

    let cleared = manager.clear_all().await;
    assert_eq!(cleared.len(), 2);
    assert!(manager.list_jobs().await.is_empty());
}

#[tokio::test]
async fn test_cleanup_removes_old_jobs_and_files() {
    let dir = TempDir::new().unwrap();
    let manager = JobManager::new();

    let old = create_job(&manager, &dir, "old.jpg").await;
    let old_output = write_file(&dir, "compressed_old.jpg").await;
    manager
        .update_job(&old.id, |j| {
            j.complete(&old_output, 10);
            j.created_at = Utc::now() - chrono::Duration::hours(25);
        })
        .await;

    let fresh = create_job(&manager, &dir, "fresh.jpg").await;

    let max_age = Duration::from_secs(24 * 3600);
    let removed = manager.cleanup_old_jobs(max_age).await;

    assert_eq!(removed, 1);
    assert!(manager.get_job(&old.id).await.is_none());
    assert!(manager.get_job(&fresh.id).await.is_some());
    assert!(!old.original_path.exists());
    assert!(!old_output.exists());
    assert!(fresh.original_path.exists());
}

#[tokio::test]
async fn test_remove_job_files_tolerates_missing() {
    let dir = TempDir::new().unwrap();
    let manager = JobManager::new();
    let job = create_job(&manager, &dir, "gone.jpg").await;

    tokio::fs::remove_file(&job.original_path).await.unwrap();
    remove_job_files(&job).await;
    remove_job_files(&job).await;
}
