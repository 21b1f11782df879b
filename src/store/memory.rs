// src/store/memory.rs

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use super::{KvStore, StoreError, Update};

/// In-process store guarded by a mutex.
///
/// `update` runs entirely under the lock. An optional byte quota (keys plus
/// values) mimics a browser storage area that refuses writes once full.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(
        &self,
        entries: &mut HashMap<String, String>,
        key: &str,
        raw: String,
    ) -> Result<(), StoreError> {
        if let Some(quota) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + raw.len() > quota {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                });
            }
        }
        entries.insert(key.to_string(), raw);
        Ok(())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, raw: String) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        self.write(&mut entries, key, raw)
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn update(&self, key: &str, f: Update) -> Result<bool, StoreError> {
        let mut entries = self.lock()?;
        match f(entries.get(key).map(String::as_str))? {
            Some(raw) => {
                self.write(&mut entries, key, raw)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
