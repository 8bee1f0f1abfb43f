use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::{Row, Sqlite, Transaction};

use quotedesk_core::domain::quotation::{
    Quotation, QuotationDraft, QuotationId, QuotationItem, QuotationItemId, UpsertOutcome,
};
use quotedesk_core::domain::request::{RequestId, RequestStatus};

use super::request::{decode_timestamp, encode_timestamp};
use super::{QuotationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlQuotationRepository {
    pool: DbPool,
}

impl SqlQuotationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw).map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn row_to_quotation(
    row: &sqlx::sqlite::SqliteRow,
    items: Vec<QuotationItem>,
) -> Result<Quotation, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let request_id: String =
        row.try_get("request_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let admin_id: String =
        row.try_get("admin_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let notes: String = row.try_get("notes").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let total_str: String =
        row.try_get("total_amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Quotation {
        id: QuotationId(id),
        request_id: RequestId(request_id),
        admin_id,
        notes,
        total_amount: decode_decimal("total_amount", &total_str)?,
        items,
        created_at: decode_timestamp("created_at", &created_at_str)?,
        updated_at: decode_timestamp("updated_at", &updated_at_str)?,
    })
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<QuotationItem, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quotation_id: String =
        row.try_get("quotation_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quantity: i64 =
        row.try_get("quantity").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let unit_price_str: String =
        row.try_get("unit_price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let amount_str: String =
        row.try_get("amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(QuotationItem {
        id: QuotationItemId(id),
        quotation_id: QuotationId(quotation_id),
        description,
        quantity: u32::try_from(quantity)
            .map_err(|_| RepositoryError::Decode(format!("quantity out of range: {quantity}")))?,
        unit_price: decode_decimal("unit_price", &unit_price_str)?,
        amount: decode_decimal("amount", &amount_str)?,
    })
}

async fn load_items(
    tx: &mut Transaction<'_, Sqlite>,
    quotation_id: &QuotationId,
) -> Result<Vec<QuotationItem>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT id, quotation_id, description, quantity, unit_price, amount
         FROM quotation_item WHERE quotation_id = ?
         ORDER BY position ASC",
    )
    .bind(&quotation_id.0)
    .fetch_all(&mut **tx)
    .await?;

    rows.iter().map(row_to_item).collect()
}

async fn insert_items(
    tx: &mut Transaction<'_, Sqlite>,
    items: &[QuotationItem],
) -> Result<(), RepositoryError> {
    for (position, item) in items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO quotation_item
                 (id, quotation_id, position, description, quantity, unit_price, amount)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&item.id.0)
        .bind(&item.quotation_id.0)
        .bind(position as i64)
        .bind(&item.description)
        .bind(i64::from(item.quantity))
        .bind(item.unit_price.to_string())
        .bind(item.amount.to_string())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn find_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    request_id: &RequestId,
) -> Result<Option<Quotation>, RepositoryError> {
    let row = sqlx::query(
        "SELECT id, request_id, admin_id, notes, total_amount, created_at, updated_at
         FROM quotation WHERE request_id = ?",
    )
    .bind(&request_id.0)
    .fetch_optional(&mut **tx)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let items = load_items(tx, &QuotationId(id)).await?;
    row_to_quotation(&row, items).map(Some)
}

fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

#[async_trait::async_trait]
impl QuotationRepository for SqlQuotationRepository {
    async fn find_by_request_id(
        &self,
        request_id: &RequestId,
    ) -> Result<Option<Quotation>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let found = find_in_tx(&mut tx, request_id).await?;
        tx.commit().await?;
        Ok(found)
    }

    async fn upsert(&self, draft: QuotationDraft) -> Result<UpsertOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let outcome = match find_in_tx(&mut tx, &draft.request_id).await? {
            Some(mut existing) => {
                existing.replace_with(draft);

                sqlx::query("DELETE FROM quotation_item WHERE quotation_id = ?")
                    .bind(&existing.id.0)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query(
                    "UPDATE quotation SET notes = ?, total_amount = ?, updated_at = ?
                     WHERE id = ?",
                )
                .bind(&existing.notes)
                .bind(existing.total_amount.to_string())
                .bind(encode_timestamp(&existing.updated_at))
                .bind(&existing.id.0)
                .execute(&mut *tx)
                .await?;
                insert_items(&mut tx, &existing.items).await?;

                UpsertOutcome::Updated(existing)
            }
            None => {
                let quotation = Quotation::from_draft(draft);

                sqlx::query(
                    "INSERT INTO quotation
                         (id, request_id, admin_id, notes, total_amount, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&quotation.id.0)
                .bind(&quotation.request_id.0)
                .bind(&quotation.admin_id)
                .bind(&quotation.notes)
                .bind(quotation.total_amount.to_string())
                .bind(encode_timestamp(&quotation.created_at))
                .bind(encode_timestamp(&quotation.updated_at))
                .execute(&mut *tx)
                .await
                .map_err(|error| {
                    if is_foreign_key_violation(&error) {
                        RepositoryError::UnknownRequest(quotation.request_id.0.clone())
                    } else {
                        RepositoryError::Database(error)
                    }
                })?;
                insert_items(&mut tx, &quotation.items).await?;
                sqlx::query("UPDATE quote_request SET status = ? WHERE id = ?")
                    .bind(RequestStatus::Replied.as_str())
                    .bind(&quotation.request_id.0)
                    .execute(&mut *tx)
                    .await?;

                UpsertOutcome::Created(quotation)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use quotedesk_core::domain::quotation::{QuotationDraft, PLACEHOLDER_ADMIN_ID};
    use quotedesk_core::domain::request::{QuoteRequest, RequestId, RequestStatus};
    use quotedesk_core::pricing::{price_items, LineItem};

    use super::SqlQuotationRepository;
    use crate::repositories::{
        QuotationRepository, RepositoryError, RequestRepository, SqlRequestRepository,
    };
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> (DbPool, QuoteRequest) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let request =
            QuoteRequest::pending("John Doe", "john@example.com", "I need a website", Utc::now());
        SqlRequestRepository::new(pool.clone()).insert(request.clone()).await.expect("insert");
        (pool, request)
    }

    fn draft(request_id: &RequestId, notes: &str, lines: &[(&str, u32, Decimal)]) -> QuotationDraft {
        let lines: Vec<LineItem> = lines
            .iter()
            .map(|(description, quantity, unit_price)| LineItem {
                description: description.to_string(),
                quantity: *quantity,
                unit_price: *unit_price,
            })
            .collect();
        QuotationDraft {
            request_id: request_id.clone(),
            admin_id: PLACEHOLDER_ADMIN_ID.to_string(),
            notes: notes.to_string(),
            priced: price_items(&lines).expect("priced lines"),
            submitted_at: Utc::now(),
        }
    }

    async fn item_count(pool: &DbPool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM quotation_item")
            .fetch_one(pool)
            .await
            .expect("count items")
    }

    #[tokio::test]
    async fn first_upsert_creates_and_marks_request_replied() {
        let (pool, request) = setup().await;
        let repo = SqlQuotationRepository::new(pool.clone());

        let outcome = repo
            .upsert(draft(
                &request.id,
                "<p>Thanks</p>",
                &[("Item 1", 2, Decimal::from(100)), ("Item 2", 1, Decimal::from(50))],
            ))
            .await
            .expect("upsert");

        assert!(outcome.was_created());
        let created = outcome.into_quotation();
        let stored = repo.find_by_request_id(&request.id).await.expect("find").expect("exists");
        assert_eq!(stored.id, created.id);
        assert_eq!(stored.notes, "<p>Thanks</p>");
        assert_eq!(stored.admin_id, "admin-1");
        assert_eq!(stored.total_amount, Decimal::from(250));
        assert_eq!(
            stored.items.iter().map(|item| item.amount).collect::<Vec<_>>(),
            vec![Decimal::from(200), Decimal::from(50)]
        );

        let status = SqlRequestRepository::new(pool)
            .find_by_id(&request.id)
            .await
            .expect("find request")
            .expect("request exists")
            .status;
        assert_eq!(status, RequestStatus::Replied);
    }

    #[tokio::test]
    async fn second_upsert_replaces_items_in_place() {
        let (pool, request) = setup().await;
        let repo = SqlQuotationRepository::new(pool.clone());

        let created = repo
            .upsert(draft(&request.id, "first", &[("a", 1, Decimal::ONE), ("b", 1, Decimal::ONE)]))
            .await
            .expect("create")
            .into_quotation();

        let mut next = draft(&request.id, "second", &[("c", 3, Decimal::new(1050, 2))]);
        next.submitted_at = created.created_at + Duration::seconds(10);
        let updated = repo.upsert(next).await.expect("update");

        assert!(!updated.was_created());
        let stored = repo.find_by_request_id(&request.id).await.expect("find").expect("exists");
        assert_eq!(stored.id, created.id);
        assert_eq!(stored.notes, "second");
        assert_eq!(stored.total_amount, Decimal::new(3150, 2));
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.items[0].description, "c");
        assert!(stored.updated_at > stored.created_at);
        assert_eq!(item_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn items_come_back_in_submission_order() {
        let (pool, request) = setup().await;
        let repo = SqlQuotationRepository::new(pool);

        repo.upsert(draft(
            &request.id,
            "",
            &[("zeta", 1, Decimal::ONE), ("alpha", 1, Decimal::ONE), ("mid", 1, Decimal::ONE)],
        ))
        .await
        .expect("upsert");

        let stored = repo.find_by_request_id(&request.id).await.expect("find").expect("exists");
        let names: Vec<_> = stored.items.iter().map(|item| item.description.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn unknown_request_writes_nothing() {
        let (pool, _) = setup().await;
        let repo = SqlQuotationRepository::new(pool.clone());
        let ghost = RequestId("does-not-exist".to_string());

        let error = repo
            .upsert(draft(&ghost, "", &[("a", 1, Decimal::ONE)]))
            .await
            .expect_err("foreign key should reject");

        assert!(matches!(error, RepositoryError::UnknownRequest(ref id) if id == "does-not-exist"));
        let quotations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quotation")
            .fetch_one(&pool)
            .await
            .expect("count quotations");
        assert_eq!(quotations, 0);
        assert_eq!(item_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn request_without_quotation_reads_as_none() {
        let (pool, request) = setup().await;
        let repo = SqlQuotationRepository::new(pool);

        assert!(repo.find_by_request_id(&request.id).await.expect("find").is_none());
    }
}
