use maillist_server_app::{
    domain::subscriber::{SubscriberRecord, SubscriberUpdate},
    ports::record_store::{RecordStore, RecordStoreError, RecordStoreResult},
};
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};

pub struct SqliteRecordStore {
    pool: Pool<Sqlite>,
}

impl SqliteRecordStore {
    pub async fn new() -> Self {
        let pool = crate::create_subscriber_db_pool().await;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS subscribers (
                email TEXT PRIMARY KEY,
                group_name TEXT,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .expect("Failed to create subscribers table");
        Self { pool }
    }

    fn record_from_row(row: &SqliteRow) -> sqlx::Result<SubscriberRecord> {
        Ok(SubscriberRecord {
            email: row.try_get("email")?,
            group: row.try_get("group_name")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn storage_error(e: sqlx::Error) -> RecordStoreError {
        RecordStoreError::Storage(e.to_string())
    }
}

#[async_trait::async_trait]
impl RecordStore for SqliteRecordStore {
    async fn add(&self, record: &SubscriberRecord) -> RecordStoreResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO subscribers (email, group_name, created_at) VALUES (?, ?, ?)",
        )
        .bind(&record.email)
        .bind(&record.group)
        .bind(&record.created_at)
        .execute(&self.pool)
        .await
        .map_err(Self::storage_error)?;
        Ok(())
    }

    async fn get_by_email(&self, email: &str) -> RecordStoreResult<Option<SubscriberRecord>> {
        let row = sqlx::query("SELECT * FROM subscribers WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::storage_error)?;
        row.map(|row| Self::record_from_row(&row).map_err(Self::storage_error))
            .transpose()
    }

    async fn get_all(&self, limit: u32) -> RecordStoreResult<Vec<SubscriberRecord>> {
        let query = if limit > 0 {
            sqlx::query("SELECT * FROM subscribers LIMIT ?").bind(limit as i64)
        } else {
            sqlx::query("SELECT * FROM subscribers")
        };
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(Self::storage_error)?;
        rows.iter()
            .map(|row| Self::record_from_row(row).map_err(Self::storage_error))
            .collect()
    }

    async fn remove(&self, email: &str) -> RecordStoreResult<()> {
        // Deleting an absent row is a no-op, which is exactly the contract.
        sqlx::query("DELETE FROM subscribers WHERE email = ?")
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(Self::storage_error)?;
        Ok(())
    }

    async fn update(&self, email: &str, update: &SubscriberUpdate) -> RecordStoreResult<()> {
        let Some(group) = &update.group else {
            // Nothing to merge; existence is still part of the contract.
            return match self.get_by_email(email).await? {
                Some(_) => Ok(()),
                None => Err(RecordStoreError::NotFound),
            };
        };
        let result = sqlx::query("UPDATE subscribers SET group_name = ? WHERE email = ?")
            .bind(group)
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(Self::storage_error)?;
        if result.rows_affected() == 0 {
            return Err(RecordStoreError::NotFound);
        }
        Ok(())
    }
}
