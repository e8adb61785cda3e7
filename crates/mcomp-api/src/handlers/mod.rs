//! HTTP request handlers.

pub mod download;
pub mod health;
pub mod index;
pub mod jobs;
pub mod thumbnail;
pub mod upload;

pub use health::health;
pub use index::index;
