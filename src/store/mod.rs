// src/store/mod.rs

//! Key-value persistence.
//!
//! Everything the service persists lives as a raw string (usually a JSON
//! array) under one of the fixed keys in [`keys`]. Components never touch
//! those blobs directly: they go through [`Repository`], which owns the
//! (de)serialization and the append convention.

pub mod memory;
pub mod repository;
pub mod sqlite;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryStore;
pub use repository::Repository;
pub use sqlite::SqliteStore;

/// Fixed storage keys.
pub mod keys {
    pub const USERS: &str = "eduAssessUsers";
    pub const CURRENT_USER_ID: &str = "eduAssessCurrentUserId";
    pub const ASSESSMENT_HISTORY: &str = "eduAssessAssessmentHistory";
    pub const THEME: &str = "eduAssessTheme";
    pub const THEME_MODE: &str = "eduAssessThemeMode";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("quota exceeded while writing '{key}'")]
    QuotaExceeded { key: String },

    #[error("corrupt value under '{key}': {source}")]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Computes the replacement for a value from its current raw form.
///
/// `Ok(None)` leaves the stored value untouched.
pub type Update = Box<dyn FnOnce(Option<&str>) -> Result<Option<String>, StoreError> + Send>;

/// Raw string store. Plain writes are last-writer-wins; reads are snapshots.
/// `update` is the only read-modify-write and is atomic within the process.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, raw: String) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Runs `f` on the current value and stores its result, with no other
    /// `update` on this store interleaving. Returns whether a write happened.
    async fn update(&self, key: &str, f: Update) -> Result<bool, StoreError>;

    /// Pushes `record` onto the JSON array under `key`, creating it if absent.
    async fn append(&self, key: &str, record: Value) -> Result<(), StoreError> {
        let owned_key = key.to_string();
        self.update(
            key,
            Box::new(move |raw: Option<&str>| push_record(&owned_key, raw, record).map(Some)),
        )
        .await?;
        Ok(())
    }
}

/// `list = parse(raw) or []; list.push(record); serialize(list)`
pub(crate) fn push_record(key: &str, raw: Option<&str>, record: Value) -> Result<String, StoreError> {
    let mut list: Vec<Value> = match raw {
        Some(raw) => serde_json::from_str(raw).map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })?,
        None => Vec::new(),
    };
    list.push(record);
    serde_json::to_string(&list).map_err(|source| StoreError::Corrupt {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn push_record_starts_a_new_list() {
        let out = push_record("k", None, json!({"a": 1})).unwrap();
        assert_eq!(out, r#"[{"a":1}]"#);
    }

    #[test]
    fn push_record_keeps_existing_order() {
        let out = push_record("k", Some("[1,2]"), json!(3)).unwrap();
        assert_eq!(out, "[1,2,3]");
    }

    #[test]
    fn push_record_rejects_non_array_payload() {
        let err = push_record("k", Some("{\"not\":\"a list\"}"), json!(1)).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { ref key, .. } if key == "k"));
    }
}
