use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use parley_core::{LastResponse, UserId};

use crate::error::Result;

/// Where each user's previous turn is remembered.
#[async_trait]
pub trait LastResponseStore: Send + Sync {
    async fn get_last_response(&self, user: UserId) -> Result<Option<LastResponse>>;
    async fn set_last_response(&self, user: UserId, last: LastResponse) -> Result<()>;
    async fn clear_last_response(&self, user: UserId) -> Result<()>;

    /// Remove and return the user's last response in one step. Of several
    /// concurrent takes for the same user, at most one sees the value.
    async fn take_last_response(&self, user: UserId) -> Result<Option<LastResponse>>;
}

#[derive(Default)]
pub struct MemoryLastResponseStore {
    entries: RwLock<HashMap<UserId, LastResponse>>,
}

impl MemoryLastResponseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl LastResponseStore for MemoryLastResponseStore {
    async fn get_last_response(&self, user: UserId) -> Result<Option<LastResponse>> {
        Ok(self.entries.read().get(&user).cloned())
    }

    async fn set_last_response(&self, user: UserId, last: LastResponse) -> Result<()> {
        self.entries.write().insert(user, last);
        Ok(())
    }

    async fn clear_last_response(&self, user: UserId) -> Result<()> {
        self.entries.write().remove(&user);
        Ok(())
    }

    async fn take_last_response(&self, user: UserId) -> Result<Option<LastResponse>> {
        Ok(self.entries.write().remove(&user))
    }
}

#[cfg(feature = "rocksdb")]
pub mod rocks {
    use super::*;
    use crate::error::StoreError;
    use parking_lot::Mutex;
    use rocksdb::{Options, DB};
    use std::path::Path;
    use std::sync::Arc;

    pub struct RocksLastResponseStore {
        db: Arc<DB>,
        // Serializes writers so a take's read and delete are not interleaved
        // with another write for the same key.
        write_lock: Mutex<()>,
    }

    impl RocksLastResponseStore {
        pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
            let mut opts = Options::default();
            opts.create_if_missing(true);

            let db = DB::open(&opts, path).map_err(|e| StoreError::Backend(e.to_string()))?;
            Ok(Self {
                db: Arc::new(db),
                write_lock: Mutex::new(()),
            })
        }

        fn key(user: UserId) -> [u8; 8] {
            user.as_u64().to_be_bytes()
        }

        fn read(&self, user: UserId) -> Result<Option<LastResponse>> {
            match self.db.get(Self::key(user)) {
                Ok(Some(bytes)) => serde_json::from_slice(&bytes)
                    .map(Some)
                    .map_err(|e| StoreError::Deserialization(e.to_string())),
                Ok(None) => Ok(None),
                Err(e) => Err(StoreError::Backend(e.to_string())),
            }
        }

        fn delete(&self, user: UserId) -> Result<()> {
            self.db
                .delete(Self::key(user))
                .map_err(|e| StoreError::Backend(e.to_string()))
        }
    }

    #[async_trait]
    impl LastResponseStore for RocksLastResponseStore {
        async fn get_last_response(&self, user: UserId) -> Result<Option<LastResponse>> {
            self.read(user)
        }

        async fn set_last_response(&self, user: UserId, last: LastResponse) -> Result<()> {
            let bytes =
                serde_json::to_vec(&last).map_err(|e| StoreError::Serialization(e.to_string()))?;
            let _guard = self.write_lock.lock();
            self.db
                .put(Self::key(user), bytes)
                .map_err(|e| StoreError::Backend(e.to_string()))
        }

        async fn clear_last_response(&self, user: UserId) -> Result<()> {
            let _guard = self.write_lock.lock();
            self.delete(user)
        }

        async fn take_last_response(&self, user: UserId) -> Result<Option<LastResponse>> {
            let _guard = self.write_lock.lock();
            let last = self.read(user)?;
            if last.is_some() {
                self.delete(user)?;
            }
            Ok(last)
        }
    }
}

#[cfg(feature = "rocksdb")]
pub use rocks::RocksLastResponseStore;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_memory_store_get_set_clear() {
        let store = MemoryLastResponseStore::new();
        let user = UserId::new(1);

        assert!(store.get_last_response(user).await.unwrap().is_none());

        let last = LastResponse::new("get_forecast").with_state("city", json!("Lisbon"));
        store.set_last_response(user, last.clone()).await.unwrap();
        assert_eq!(store.get_last_response(user).await.unwrap(), Some(last));
        assert_eq!(store.len(), 1);

        store.clear_last_response(user).await.unwrap();
        assert!(store.get_last_response(user).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_is_per_user() {
        let store = MemoryLastResponseStore::new();
        store
            .set_last_response(UserId::new(1), LastResponse::new("get_forecast"))
            .await
            .unwrap();

        assert!(store
            .get_last_response(UserId::new(2))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_memory_take_removes_once() {
        let store = Arc::new(MemoryLastResponseStore::new());
        let user = UserId::new(5);
        store
            .set_last_response(user, LastResponse::new("get_forecast"))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.take_last_response(user).await.unwrap()
            }));
        }

        let mut taken = Vec::new();
        for handle in handles {
            if let Some(last) = handle.await.unwrap() {
                taken.push(last);
            }
        }

        assert_eq!(taken, vec![LastResponse::new("get_forecast")]);
        assert!(store.is_empty());
    }

    #[cfg(feature = "rocksdb")]
    #[tokio::test]
    async fn test_rocks_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("parley-rocks-{}", std::process::id()));
        let store = RocksLastResponseStore::open(&dir).unwrap();
        let user = UserId::new(9);

        let last = LastResponse::new("book_table").with_state("party", json!(4));
        store.set_last_response(user, last.clone()).await.unwrap();
        assert_eq!(store.get_last_response(user).await.unwrap(), Some(last));

        store.clear_last_response(user).await.unwrap();
        assert!(store.get_last_response(user).await.unwrap().is_none());

        store.set_last_response(user, last.clone()).await.unwrap();
        assert_eq!(store.take_last_response(user).await.unwrap(), Some(last));
        assert!(store.take_last_response(user).await.unwrap().is_none());

        drop(store);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
