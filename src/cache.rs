//! Time-boxed response cache
//!
//! Weather responses are memoized on disk per location and request so that
//! repeated refreshes within the TTL do not hit the network. This is an
//! optimisation only: callers treat every cache error as a miss.

use fjall::Keyspace;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt::{Debug, Display};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task;

use crate::{AgroTechError, Result};

#[derive(Serialize, Deserialize)]
struct StoredEntry<T> {
    value: T,
    expires_at: u64, // Unix timestamp (seconds)
}

#[derive(Clone)]
pub struct ResponseCache {
    store: Keyspace,
}

fn cache_error(context: &str, error: impl Display) -> AgroTechError {
    AgroTechError::cache(format!("{context}: {error}"))
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    let value = store
        .get(key)
        .map_err(|e| cache_error("read failed", e))?;
    Ok(value.map(|v| v.to_vec()))
}

fn now_secs() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| cache_error("system clock is before the Unix epoch", e))
}

impl ResponseCache {
    /// Open (or create) the cache database under `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path)
            .open()
            .map_err(|e| cache_error("failed to open database", e))?;
        let items = db
            .keyspace("responses", fjall::KeyspaceCreateOptions::default)
            .map_err(|e| cache_error("failed to open keyspace", e))?;
        Ok(ResponseCache { store: items })
    }

    /// Stores a serializable value with a time-to-live (TTL).
    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, value))]
    pub async fn put<T: Serialize + Send + Debug + 'static>(
        &self,
        key: &str,
        value: T,
        ttl: Duration,
    ) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        let expires_at = now_secs()?.saturating_add(ttl.as_secs());
        let entry = StoredEntry { value, expires_at };
        let bytes = postcard::to_stdvec(&entry).map_err(|e| cache_error("encode failed", e))?;

        task::spawn_blocking(move || store.insert(key, bytes))
            .await
            .map_err(|e| cache_error("write task failed", e))?
            .map_err(|e| cache_error("write failed", e))?;
        Ok(())
    }

    /// Retrieves a value if it exists and has not expired.
    /// Returns `None` for cache misses or expired entries.
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    pub async fn get<T: DeserializeOwned + Send + 'static>(&self, key: &str) -> Result<Option<T>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes: Option<Vec<u8>> =
            task::spawn_blocking(move || get_from_store(store, key_bytes))
                .await
                .map_err(|e| cache_error("read task failed", e))??;

        let Some(bytes) = maybe_bytes else {
            tracing::debug!("Key not found");
            return Ok(None);
        };

        let entry: StoredEntry<T> =
            postcard::from_bytes(&bytes).map_err(|e| cache_error("decode failed", e))?;
        if now_secs()? < entry.expires_at {
            tracing::debug!("Key found and still fresh");
            Ok(Some(entry.value))
        } else {
            tracing::debug!("Key found but expired");
            self.remove(key).await?;
            Ok(None)
        }
    }

    /// Manually removes a key from the cache.
    pub async fn remove(&self, key: &str) -> Result<()> {
        let key = key.as_bytes().to_vec();
        let store = self.store.clone();
        task::spawn_blocking(move || store.remove(key))
            .await
            .map_err(|e| cache_error("remove task failed", e))?
            .map_err(|e| cache_error("remove failed", e))?;
        Ok(())
    }
}
