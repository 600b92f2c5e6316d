//! Query execution seam

use async_trait::async_trait;
use sqlx::postgres::PgPool;

use super::value::{row_to_json, ResultSet};

/// Runs one already-accepted statement and materializes every row
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn fetch_all(&self, sql: &str) -> Result<ResultSet, sqlx::Error>;
}

/// Postgres executor backed by a connection pool
#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn fetch_all(&self, sql: &str) -> Result<ResultSet, sqlx::Error> {
        // Returned to the pool when dropped, on every path out of this scope
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query(sql)
            .persistent(false)
            .fetch_all(&mut *conn)
            .await?;

        rows.iter().map(row_to_json).collect()
    }
}
