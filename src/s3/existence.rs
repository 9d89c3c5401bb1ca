use tracing::{debug, warn};

use super::error::{Result, UploadError};
use super::store::{HeadStatus, ObjectStore};

/// How an existence check that fails for a reason other than not-found is treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeadErrorPolicy {
    /// Assume the object exists and skip it
    #[default]
    Skip,
    /// Abort the run
    Abort,
}

/// Decide whether the upload of `key` should be skipped
///
/// Forced uploads never touch the store. Otherwise one HEAD request is made.
pub async fn should_skip<S>(
    store: &S,
    key: &str,
    force: bool,
    on_head_error: HeadErrorPolicy,
) -> Result<bool>
where
    S: ObjectStore + ?Sized,
{
    if force {
        return Ok(false);
    }

    match store.head_object(key).await {
        Ok(HeadStatus::Exists) => Ok(true),
        Ok(HeadStatus::NotFound) => {
            debug!("\"{}\" not found remotely", key);
            Ok(false)
        }
        Err(e) => match on_head_error {
            HeadErrorPolicy::Skip => {
                warn!(
                    "existence check for \"{}\" failed, treating as existing: {:#}",
                    key, e
                );
                Ok(true)
            }
            HeadErrorPolicy::Abort => Err(UploadError::Head {
                key: key.to_string(),
                message: format!("{:#}", e),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::testing::MemoryStore;

    #[tokio::test]
    async fn test_force_never_checks() {
        let store = MemoryStore::default().with_object("a.txt", b"old");

        assert!(!should_skip(&store, "a.txt", true, HeadErrorPolicy::Skip).await.unwrap());
        assert_eq!(store.head_calls(), 0);
    }

    #[tokio::test]
    async fn test_existing_and_missing() {
        let store = MemoryStore::default().with_object("a.txt", b"old");

        assert!(should_skip(&store, "a.txt", false, HeadErrorPolicy::Skip).await.unwrap());
        assert!(!should_skip(&store, "b.txt", false, HeadErrorPolicy::Skip).await.unwrap());
        assert_eq!(store.head_calls(), 2);
    }

    #[tokio::test]
    async fn test_head_error_policy() {
        let store = MemoryStore::default().with_head_error("503 Service Unavailable");

        assert!(should_skip(&store, "a.txt", false, HeadErrorPolicy::Skip).await.unwrap());

        let err = should_skip(&store, "a.txt", false, HeadErrorPolicy::Abort)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Head { ref key, .. } if key == "a.txt"));
        assert!(err.to_string().contains("503"));
    }
}
