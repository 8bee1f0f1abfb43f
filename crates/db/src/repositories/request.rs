use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use quotedesk_core::domain::request::{QuoteRequest, RequestId, RequestStatus};

use super::{RepositoryError, RequestRepository};
use crate::DbPool;

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Fixed-width UTC text so lexical order in SQLite matches time order.
pub(crate) fn encode_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<QuoteRequest, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let email: String =
        row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(QuoteRequest {
        id: RequestId(id),
        name,
        email,
        description,
        status: RequestStatus::from_str(&status_str).map_err(RepositoryError::Decode)?,
        created_at: decode_timestamp("created_at", &created_at_str)?,
    })
}

#[async_trait::async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn insert(&self, request: QuoteRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO quote_request (id, name, email, description, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.description)
        .bind(request.status.as_str())
        .bind(encode_timestamp(&request.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &RequestId) -> Result<Option<QuoteRequest>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, email, description, status, created_at
             FROM quote_request WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_request).transpose()
    }

    async fn list_recent_first(&self) -> Result<Vec<QuoteRequest>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, email, description, status, created_at
             FROM quote_request
             ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_request).collect()
    }
}
