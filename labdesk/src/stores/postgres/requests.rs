//! Request storage with a sequence for request numbers.

use super::{decode, decode_all, encode};
use crate::error::{LabError, Result};
use crate::providers::RequestRepository;
use crate::request::{Request, RequestStatus};
use crate::types::RequestId;
use async_trait::async_trait;
use sqlx::types::JsonValue;
use sqlx::PgPool;

/// `PostgreSQL` request repository.
#[derive(Clone)]
pub struct PostgresRequestRepository {
    pool: PgPool,
}

impl PostgresRequestRepository {
    /// Create a repository on `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestRepository for PostgresRequestRepository {
    async fn next_number(&self) -> Result<i64> {
        let (number,): (i64,) = sqlx::query_as("SELECT nextval('request_number_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| LabError::storage("reserve request number", e))?;
        Ok(number)
    }

    async fn insert(&self, request: &Request) -> Result<()> {
        let operation = format!("insert request {}", request.id);
        let data = encode(request, &operation)?;

        sqlx::query(
            r"
            INSERT INTO requests (id, number, status, deleted, creation_date, version, data)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(request.id.as_uuid())
        .bind(request.number)
        .bind(request.status.as_str())
        .bind(request.deletion.is_deleted())
        .bind(request.creation_date)
        .bind(request.version)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(|e| LabError::storage(&operation, e))?;

        Ok(())
    }

    async fn get(&self, id: RequestId) -> Result<Option<Request>> {
        let operation = format!("load request {id}");
        let row: Option<(JsonValue,)> = sqlx::query_as("SELECT data FROM requests WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| LabError::storage(&operation, e))?;

        row.map(|(json,)| decode(json, &operation)).transpose()
    }

    /// Conditional `UPDATE ... WHERE version = $expected`. When no row
    /// matches, a second read tells a missing request from a lost race.
    async fn update(&self, request: &Request) -> Result<i64> {
        let operation = format!("update request {}", request.id);
        let version = request.version + 1;
        let data = encode(
            &Request {
                version,
                ..request.clone()
            },
            &operation,
        )?;

        let result = sqlx::query(
            r"
            UPDATE requests
            SET status = $2, deleted = $3, data = $4, version = $5
            WHERE id = $1 AND version = $6
            ",
        )
        .bind(request.id.as_uuid())
        .bind(request.status.as_str())
        .bind(request.deletion.is_deleted())
        .bind(data)
        .bind(version)
        .bind(request.version)
        .execute(&self.pool)
        .await
        .map_err(|e| LabError::storage(&operation, e))?;

        if result.rows_affected() == 1 {
            return Ok(version);
        }

        let current: Option<(i64,)> = sqlx::query_as("SELECT version FROM requests WHERE id = $1")
            .bind(request.id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| LabError::storage(&operation, e))?;

        match current {
            Some((actual,)) => Err(LabError::conflict(
                "Request",
                request.id,
                request.version,
                actual,
            )),
            None => Err(LabError::not_found("Request", request.id)),
        }
    }

    async fn list(&self, status: Option<RequestStatus>) -> Result<Vec<Request>> {
        let operation = match status {
            Some(status) => format!("fetch {status} requests"),
            None => "fetch requests".to_string(),
        };

        let rows: Vec<(JsonValue,)> = sqlx::query_as(
            r"
            SELECT data FROM requests
            WHERE NOT deleted AND ($1::TEXT IS NULL OR status = $1)
            ORDER BY number DESC
            ",
        )
        .bind(status.map(RequestStatus::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LabError::storage(&operation, e))?;

        decode_all(rows, &operation)
    }
}
