use anyhow::Result;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize database connection and run migrations
pub async fn init_db(db_path: &Path) -> Result<SqlitePool> {
    let db_url = format!("sqlite://{}", db_path.display());

    // Create database file if it doesn't exist
    if !sqlx::Sqlite::database_exists(&db_url).await? {
        tracing::info!("Creating database at {}", db_path.display());
        sqlx::Sqlite::create_database(&db_url).await?;
    }

    let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    tracing::info!("Database initialized successfully");
    Ok(pool)
}

/// Open a private in-memory database (one connection, so every query sees the same data)
pub async fn init_memory_db() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Run database migrations
async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    tracing::info!("Running database migrations");

    // Migration 001: Song catalog
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS song (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            mood TEXT NOT NULL CHECK(mood IN ('happy', 'sad', 'angry', 'fearful', 'disgusted', 'surprised', 'neutral')),
            audio_url TEXT NOT NULL,
            cover_url TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_song_mood ON song(mood);
    "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = init_memory_db().await.unwrap();
        run_migrations(&pool).await.unwrap();

        let count: i64 = sqlx::query("SELECT COUNT(*) FROM song")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get(0);
        assert_eq!(count, 0);
    }
}
