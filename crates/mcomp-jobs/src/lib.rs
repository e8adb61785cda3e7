//! In-memory compression job registry.
//!
//! This crate provides:
//! - Job creation from stored uploads
//! - Status updates, listing and deletion
//! - Age-based cleanup of jobs and their files

pub mod error;
pub mod manager;

pub use error::{JobError, JobResult};
pub use manager::{remove_job_files, JobManager};
