use std::path::Path;

use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};

use crate::core::errors::ApiError;

/// One answered query as shown by the history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatExchange {
    pub id: i64,
    pub query: String,
    pub response: String,
    /// "override", "retrieved", "general_knowledge" or "degraded".
    pub grounding: String,
    pub created_at: String,
}

#[derive(Clone)]
pub struct ChatHistoryStore {
    pool: SqlitePool,
}

impl ChatHistoryStore {
    pub async fn new(db_path: &Path) -> Result<Self, ApiError> {
        let conn_str = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&conn_str)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to connect to history db: {}", e)))?;
        Self::init(pool).await
    }

    /// A private database that lives as long as the store.
    pub async fn in_memory() -> Result<Self, ApiError> {
        // Every sqlite memory connection is its own database, so keep one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| ApiError::internal(format!("Failed to open in-memory history: {}", e)))?;
        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> Result<Self, ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chat_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query TEXT NOT NULL,
                response TEXT NOT NULL,
                grounding TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to init chat_history table: {}", e)))?;

        Ok(Self { pool })
    }

    pub async fn record(
        &self,
        query: &str,
        response: &str,
        grounding: &str,
    ) -> Result<i64, ApiError> {
        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO chat_history (query, response, grounding, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(query)
        .bind(response)
        .bind(grounding)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to record chat exchange: {}", e)))?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent exchanges first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<ChatExchange>, ApiError> {
        let rows = sqlx::query(
            "SELECT id, query, response, grounding, created_at FROM chat_history
             ORDER BY id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        rows.into_iter()
            .map(|row| {
                Ok(ChatExchange {
                    id: row.try_get("id").map_err(ApiError::internal)?,
                    query: row.try_get("query").map_err(ApiError::internal)?,
                    response: row.try_get("response").map_err(ApiError::internal)?,
                    grounding: row.try_get("grounding").map_err(ApiError::internal)?,
                    created_at: row.try_get("created_at").map_err(ApiError::internal)?,
                })
            })
            .collect()
    }

    pub async fn count(&self) -> Result<i64, ApiError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM chat_history")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        row.try_get("total").map_err(ApiError::internal)
    }
}
