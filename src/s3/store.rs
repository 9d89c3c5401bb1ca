//! Object store seam
//!
//! The upload engine talks to the store only through this trait, so the
//! R2 adapter can be swapped for an in-memory fake in tests.

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Streaming request body handed to [`ObjectStore::put_object`]
pub type UploadBody = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// Outcome of an existence check that reached the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadStatus {
    Exists,
    NotFound,
}

/// Reading the local body failed while the object was being written.
///
/// Stores return this (inside the `anyhow::Error`) so the caller can tell a
/// local IO failure apart from a remote write failure.
#[derive(Error, Debug)]
#[error("failed to read local file: {0}")]
pub struct LocalReadError(#[from] pub std::io::Error);

/// Existence-check and write operations against a single bucket
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check whether `key` exists. A missing object is `Ok(HeadStatus::NotFound)`,
    /// never an error.
    async fn head_object(&self, key: &str) -> Result<HeadStatus>;

    /// Stream `content_length` bytes from `body` to `key`
    async fn put_object(
        &self,
        key: &str,
        body: UploadBody,
        content_type: Option<&str>,
        content_length: u64,
    ) -> Result<()>;
}
