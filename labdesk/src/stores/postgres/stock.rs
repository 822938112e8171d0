//! Stock registry over the per-kind tables.

use super::{decode, decode_all, encode};
use crate::error::{LabError, Result};
use crate::stock::{StockItem, StockRegistry};
use crate::types::StockItemId;
use async_trait::async_trait;
use sqlx::types::JsonValue;
use sqlx::PgPool;
use std::marker::PhantomData;

/// Registry for one stock kind; the table is `T::KIND.collection()`.
#[derive(Clone)]
pub struct PostgresStockRegistry<T> {
    pool: PgPool,
    _kind: PhantomData<fn() -> T>,
}

impl<T: StockItem> PostgresStockRegistry<T> {
    /// Create a registry on `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _kind: PhantomData,
        }
    }

    const fn table() -> &'static str {
        T::KIND.collection()
    }
}

#[async_trait]
impl<T: StockItem> StockRegistry<T> for PostgresStockRegistry<T> {
    async fn list(&self, available: Option<bool>) -> Result<Vec<T>> {
        let table = Self::table();
        let (operation, rows) = match available {
            None => {
                let operation = format!("fetch {table}");
                let rows: Vec<(JsonValue,)> = sqlx::query_as(&format!(
                    "SELECT data FROM {table} ORDER BY inserted_at"
                ))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| LabError::storage(&operation, e))?;
                (operation, rows)
            }
            Some(flag) => {
                let operation = if flag {
                    format!("fetch available {table}")
                } else {
                    format!("fetch unavailable {table}")
                };
                let rows: Vec<(JsonValue,)> = sqlx::query_as(&format!(
                    "SELECT data FROM {table}
                     WHERE NOT deleted AND is_available = $1
                     ORDER BY inserted_at"
                ))
                .bind(flag)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| LabError::storage(&operation, e))?;
                (operation, rows)
            }
        };

        decode_all(rows, &operation)
    }

    async fn get(&self, id: StockItemId) -> Result<Option<T>> {
        let operation = format!("load {} {id}", T::KIND.label().to_lowercase());
        let row: Option<(JsonValue,)> =
            sqlx::query_as(&format!("SELECT data FROM {} WHERE id = $1", Self::table()))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| LabError::storage(&operation, e))?;

        row.map(|(json,)| decode(json, &operation)).transpose()
    }

    async fn insert(&self, item: &T) -> Result<()> {
        let operation = format!("insert {} {}", T::KIND.label().to_lowercase(), item.id());
        let data = encode(item, &operation)?;

        sqlx::query(&format!(
            "INSERT INTO {} (id, data, is_available, deleted) VALUES ($1, $2, $3, $4)",
            Self::table()
        ))
        .bind(item.id().as_uuid())
        .bind(data)
        .bind(item.is_flagged_available())
        .bind(item.deletion().is_deleted())
        .execute(&self.pool)
        .await
        .map_err(|e| LabError::storage(&operation, e))?;

        Ok(())
    }

    async fn update(&self, item: &T) -> Result<()> {
        let operation = format!("update {} {}", T::KIND.label().to_lowercase(), item.id());
        let data = encode(item, &operation)?;

        let result = sqlx::query(&format!(
            "UPDATE {} SET data = $2, is_available = $3, deleted = $4 WHERE id = $1",
            Self::table()
        ))
        .bind(item.id().as_uuid())
        .bind(data)
        .bind(item.is_flagged_available())
        .bind(item.deletion().is_deleted())
        .execute(&self.pool)
        .await
        .map_err(|e| LabError::storage(&operation, e))?;

        if result.rows_affected() == 0 {
            return Err(LabError::not_found(T::KIND.label(), item.id()));
        }
        Ok(())
    }
}
