//! fodcache - content-addressed fetch cache for fixed-output store paths
//!
//! Predicts the store path an artifact will get before downloading it, and
//! skips the download when that path already exists.

pub mod archive;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod network;
pub mod store;

pub use error::{FodError, FodResult};
