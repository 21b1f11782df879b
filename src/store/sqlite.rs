// src/store/sqlite.rs

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::Mutex;

use super::{KvStore, StoreError, Update};

/// Embedded key-value store on a single SQLite table.
///
/// Updates (appends included) are serialized in-process and each runs inside
/// one transaction, so concurrent writers never drop each other's changes.
pub struct SqliteStore {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn read(conn: &mut SqliteConnection, key: &str) -> Result<Option<String>, StoreError> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_entries WHERE key = ?")
        .bind(key)
        .fetch_optional(conn)
        .await?;
    Ok(value)
}

async fn upsert(conn: &mut SqliteConnection, key: &str, raw: &str) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO kv_entries (key, value, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(raw)
    .bind(chrono::Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl KvStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        read(&mut conn, key).await
    }

    async fn set(&self, key: &str, raw: String) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        upsert(&mut conn, key, &raw).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update(&self, key: &str, f: Update) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let current = read(&mut tx, key).await?;
        let Some(updated) = f(current.as_deref())? else {
            return Ok(false);
        };
        upsert(&mut tx, key, &updated).await?;

        tx.commit().await?;
        Ok(true)
    }
}
