pub mod client;
pub mod content_type;
pub mod error;
pub mod existence;
pub mod key;
pub mod progress;
pub mod store;
pub mod upload;
pub mod walk;

#[cfg(test)]
mod testing;

pub use client::R2Client;
pub use existence::HeadErrorPolicy;
pub use upload::{UploadObserver, UploadOptions, UploadRun, UploadTask, Uploader};
