//! Background services.

pub mod janitor;
pub mod processor;

pub use janitor::JobJanitor;
pub use processor::{process_compression_job, spawn_compression};
