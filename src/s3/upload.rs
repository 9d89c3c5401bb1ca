use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tracing::{debug, info, trace};

use super::content_type::resolve_content_type;
use super::error::{Result, UploadError};
use super::existence::{HeadErrorPolicy, should_skip};
use super::key::{map_key, normalize_remote_path};
use super::progress::ProgressReader;
use super::store::{LocalReadError, ObjectStore};
use super::walk::walk_files;

/// Default wall-clock limit for a whole run
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// One file that is about to be written to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub local_path: PathBuf,
    pub remote_key: String,
    pub size_bytes: u64,
    pub content_type: Option<String>,
}

/// State and final tallies of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRun {
    pub root_local_path: PathBuf,
    pub root_remote_prefix: String,
    pub force: bool,
    pub dry_run: bool,
    pub uploaded: usize,
    pub skipped: usize,
    pub bytes_uploaded: u64,
}

#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Overwrite without checking whether the key exists
    pub force: bool,
    pub on_head_error: HeadErrorPolicy,
    /// Decide and log, but never open or write files
    pub dry_run: bool,
    pub timeout: Duration,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            force: true,
            on_head_error: HeadErrorPolicy::default(),
            dry_run: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Receives per-file notifications from the uploader. All methods default to no-ops.
pub trait UploadObserver: Send + Sync {
    fn skipped(&self, _key: &str) {}

    fn started(&self, _index: usize, _task: &UploadTask) {}

    /// Raw byte counts for the file currently being uploaded
    fn progress(&self, _read: u64, _total: u64) {}

    fn finished(&self, _task: &UploadTask) {}
}

pub struct NoopObserver;

impl UploadObserver for NoopObserver {}

/// Sequential upload engine: walk, decide, upload, tally
pub struct Uploader<S> {
    store: S,
    options: UploadOptions,
    observer: Arc<dyn UploadObserver>,
}

impl<S: ObjectStore> Uploader<S> {
    pub fn new(store: S, options: UploadOptions) -> Self {
        Self {
            store,
            options,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn UploadObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Upload `local_path` (a file or a directory tree) under `remote_path`
    ///
    /// The first error aborts the run; files already written stay written.
    pub async fn run(&self, local_path: &Path, remote_path: &str) -> Result<UploadRun> {
        tokio::time::timeout(self.options.timeout, self.run_inner(local_path, remote_path))
            .await
            .map_err(|_| UploadError::Timeout(self.options.timeout))?
    }

    async fn run_inner(&self, local_path: &Path, remote_path: &str) -> Result<UploadRun> {
        let remote_path = normalize_remote_path(remote_path);
        info!("upload \"{}\" to \"{}\"", local_path.display(), remote_path);

        let metadata = tokio::fs::metadata(local_path)
            .await
            .map_err(|e| UploadError::from_io_error(e, local_path))?;

        let root = std::path::absolute(local_path)
            .map_err(|e| UploadError::from_io_error(e, local_path))?;

        let mut run = UploadRun {
            root_local_path: root.clone(),
            root_remote_prefix: remote_path.to_string(),
            force: self.options.force,
            dry_run: self.options.dry_run,
            uploaded: 0,
            skipped: 0,
            bytes_uploaded: 0,
        };

        if metadata.is_dir() {
            for entry in walk_files(&root) {
                let path = entry?;
                let key = map_key(&root, &path, remote_path);
                self.process(&mut run, &path, key).await?;
            }
        } else {
            if remote_path.is_empty() {
                return Err(UploadError::EmptyKey);
            }
            self.process(&mut run, &root, remote_path.to_string())
                .await?;
        }

        info!(
            "{} {} files, skipped {} files",
            if run.dry_run { "would upload" } else { "uploaded" },
            run.uploaded,
            run.skipped
        );

        Ok(run)
    }

    /// Existence check, then skip or upload a single file
    async fn process(&self, run: &mut UploadRun, path: &Path, key: String) -> Result<()> {
        if should_skip(&self.store, &key, self.options.force, self.options.on_head_error).await? {
            info!("\"{}\" exists, skipping", key);
            run.skipped += 1;
            self.observer.skipped(&key);
            return Ok(());
        }

        let content_type = resolve_content_type(path);

        if run.dry_run {
            let size = tokio::fs::metadata(path)
                .await
                .map_err(|e| UploadError::from_io_error(e, path))?
                .len();
            info!(
                "would upload [{:>4}] {} as {} ({} bytes)",
                run.uploaded,
                key,
                content_type.as_deref().unwrap_or(""),
                size
            );
            run.uploaded += 1;
            return Ok(());
        }

        let file = File::open(path)
            .await
            .map_err(|e| UploadError::from_io_error(e, path))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| UploadError::from_io_error(e, path))?
            .len();

        let task = UploadTask {
            local_path: path.to_path_buf(),
            remote_key: key,
            size_bytes: size,
            content_type,
        };

        info!(
            "uploading [{:>4}] {} as {}",
            run.uploaded,
            task.remote_key,
            task.content_type.as_deref().unwrap_or("")
        );
        self.observer.started(run.uploaded, &task);

        let observer = Arc::clone(&self.observer);
        let reader = ProgressReader::new(file, size, move |read, total| {
            trace!("Uploaded {} out of {} bytes", read, total);
            observer.progress(read, total);
        });

        self.store
            .put_object(
                &task.remote_key,
                Box::new(reader),
                task.content_type.as_deref(),
                task.size_bytes,
            )
            .await
            .map_err(|e| match e.downcast::<LocalReadError>() {
                Ok(LocalReadError(io)) => UploadError::from_io_error(io, path),
                Err(e) => UploadError::Put {
                    key: task.remote_key.clone(),
                    message: format!("{:#}", e),
                },
            })?;
        debug!("sent {} bytes for {}", size, task.remote_key);

        run.uploaded += 1;
        run.bytes_uploaded += task.size_bytes;
        self.observer.finished(&task);

        Ok(())
    }
}
