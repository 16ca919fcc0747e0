use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::time::Duration;
use tracing::info;

// Параметры пула фиксированы, настраивать их через окружение не нужно
const MAX_CONNECTIONS: u32 = 50;
const MIN_CONNECTIONS: u32 = 10;
const MAX_LIFETIME: Duration = Duration::from_secs(5 * 60);
const PING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Postgres>,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .min_connections(MIN_CONNECTIONS)
            .max_lifetime(MAX_LIFETIME)
            .acquire_timeout(PING_TIMEOUT)
            .connect(database_url)
            .await?;

        let db = Database { pool };
        db.ping().await?;
        Ok(db)
    }

    /// Проверка соединения при старте.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        tokio::time::timeout(PING_TIMEOUT, sqlx::query("SELECT 1").execute(&self.pool))
            .await
            .map_err(|_| sqlx::Error::PoolTimedOut)??;
        info!("Database ping ok");
        Ok(())
    }
}
