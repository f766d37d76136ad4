use sqlx::{Pool, Sqlite, sqlite::SqlitePoolOptions};

mod subscribers;

pub use subscribers::SqliteRecordStore;

pub(crate) async fn create_subscriber_db_pool() -> Pool<Sqlite> {
    let db_url =
        std::env::var("MAILLIST_DATABASE_URL").expect("MAILLIST_DATABASE_URL env var not set");
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .expect("Failed to connect to subscriber database")
}
