//! In-memory `ObjectStore` used by the unit tests

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::AsyncReadExt;

use super::store::{HeadStatus, LocalReadError, ObjectStore, UploadBody};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub content_length: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    put_attempts: Mutex<Vec<String>>,
    head_calls: AtomicUsize,
    head_error: Option<String>,
    fail_put_at: Option<usize>,
    put_delay: Option<Duration>,
    put_read_limit: Option<u64>,
}

impl MemoryStore {
    pub fn with_object(self, key: &str, body: &[u8]) -> Self {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body: body.to_vec(),
                content_type: None,
                content_length: body.len() as u64,
            },
        );
        self
    }

    /// Every HEAD fails with `message`
    pub fn with_head_error(mut self, message: &str) -> Self {
        self.head_error = Some(message.to_string());
        self
    }

    /// The PUT attempt with this zero-based index fails
    pub fn with_put_failure_at(mut self, attempt: usize) -> Self {
        self.fail_put_at = Some(attempt);
        self
    }

    pub fn with_put_delay(mut self, delay: Duration) -> Self {
        self.put_delay = Some(delay);
        self
    }

    /// PUTs consume at most `limit` body bytes and then fail, like a dropped connection
    pub fn with_put_read_limit(mut self, limit: u64) -> Self {
        self.put_read_limit = Some(limit);
        self
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Keys of every PUT attempt, in order, including failed ones
    pub fn put_attempts(&self) -> Vec<String> {
        self.put_attempts.lock().unwrap().clone()
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head_object(&self, key: &str) -> Result<HeadStatus> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.head_error {
            return Err(anyhow!("{}", message));
        }

        if self.objects.lock().unwrap().contains_key(key) {
            Ok(HeadStatus::Exists)
        } else {
            Ok(HeadStatus::NotFound)
        }
    }

    async fn put_object(
        &self,
        key: &str,
        mut body: UploadBody,
        content_type: Option<&str>,
        content_length: u64,
    ) -> Result<()> {
        let attempt = {
            let mut attempts = self.put_attempts.lock().unwrap();
            attempts.push(key.to_string());
            attempts.len() - 1
        };

        if let Some(delay) = self.put_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_put_at == Some(attempt) {
            return Err(anyhow!("injected PutObject failure for {}", key));
        }

        if let Some(limit) = self.put_read_limit {
            let mut buf = Vec::new();
            (&mut body)
                .take(limit)
                .read_to_end(&mut buf)
                .await
                .map_err(LocalReadError)?;
            return Err(anyhow!("connection closed after {} bytes of {}", buf.len(), key));
        }

        let mut buf = Vec::new();
        body.read_to_end(&mut buf).await.map_err(LocalReadError)?;

        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body: buf,
                content_type: content_type.map(str::to_string),
                content_length,
            },
        );

        Ok(())
    }
}
