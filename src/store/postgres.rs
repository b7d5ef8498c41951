//! PostgreSQL coordination store.
//!
//! One row per stack key, with the key's parts in their own columns and the
//! record stored as JSONB. `put` is an upsert, so the last write wins without
//! conditional updates.

use super::{is_sql_identifier, CoordinationStore, StackRecord};
use crate::config::StoreConfig;
use crate::error::{ReconcilerError, Result};
use crate::models::StackKey;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PgCoordinationStore {
    pool: PgPool,
    table_name: String,
}

impl PgCoordinationStore {
    /// Wrap an existing pool. `table_name` must be a plain SQL identifier.
    pub fn new(pool: PgPool, table_name: impl Into<String>) -> Result<Self> {
        let table_name = table_name.into();
        if !is_sql_identifier(&table_name) {
            return Err(ReconcilerError::Configuration(format!(
                "'{table_name}' is not a valid table name"
            )));
        }
        Ok(Self { pool, table_name })
    }

    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let database_url = config.database_url.as_deref().ok_or_else(|| {
            ReconcilerError::Configuration("store.database_url is not set".to_string())
        })?;
        let pool = PgPool::connect(database_url).await?;
        info!(table = %config.table_name, "Connected coordination store");
        Self::new(pool, config.table_name.clone())
    }

    /// Create the record table if it is missing
    pub async fn ensure_schema(&self) -> Result<()> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                stack_name TEXT NOT NULL,
                region TEXT NOT NULL,
                account_id TEXT NOT NULL,
                record JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (stack_name, region, account_id)
            )
            "#,
            self.table_name
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CoordinationStore for PgCoordinationStore {
    async fn put(&self, key: &StackKey, record: StackRecord) -> Result<()> {
        debug!(
            stack_key = %key,
            client_request_token = %record.client_request_token,
            "Writing stack record"
        );
        let sql = format!(
            "INSERT INTO {} (stack_name, region, account_id, record, updated_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             ON CONFLICT (stack_name, region, account_id) \
             DO UPDATE SET record = EXCLUDED.record, updated_at = NOW()",
            self.table_name
        );
        sqlx::query(&sql)
            .bind(&key.stack_name)
            .bind(&key.region)
            .bind(&key.account_id)
            .bind(Json(&record))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &StackKey) -> Result<Option<StackRecord>> {
        let sql = format!(
            "SELECT record FROM {} WHERE stack_name = $1 AND region = $2 AND account_id = $3",
            self.table_name
        );
        let row = sqlx::query(&sql)
            .bind(&key.stack_name)
            .bind(&key.region)
            .bind(&key.account_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let Json(record): Json<StackRecord> = row.try_get("record")?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &StackKey) -> Result<()> {
        debug!(stack_key = %key, "Deleting stack record");
        let sql = format!(
            "DELETE FROM {} WHERE stack_name = $1 AND region = $2 AND account_id = $3",
            self.table_name
        );
        sqlx::query(&sql)
            .bind(&key.stack_name)
            .bind(&key.region)
            .bind(&key.account_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_rejects_unsafe_table_name() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgresql://localhost/reconciler")
            .expect("lazy pool");
        let result = PgCoordinationStore::new(pool, "x; DROP TABLE y");
        assert!(matches!(result, Err(ReconcilerError::Configuration(_))));
    }
}
