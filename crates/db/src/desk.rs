//! The quotation desk: validates inbound payloads, prices line items and
//! drives the repositories. HTTP handlers and the CLI seed both go through
//! here so every write path shares the same checks.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{info, warn};

use quotedesk_core::domain::quotation::{Quotation, QuotationDraft, UpsertOutcome};
use quotedesk_core::domain::request::{QuoteRequest, RequestId};
use quotedesk_core::errors::ApplicationError;
use quotedesk_core::input::{NewRequestInput, QuotationInput};
use quotedesk_core::pricing::{price_items, PricedItems};

use crate::repositories::{
    InMemoryDeskRepository, QuotationRepository, RequestRepository, SqlQuotationRepository,
    SqlRequestRepository,
};
use crate::DbPool;

#[derive(Clone)]
pub struct QuotationDesk {
    requests: Arc<dyn RequestRepository>,
    quotations: Arc<dyn QuotationRepository>,
    admin_id: String,
}

impl QuotationDesk {
    pub fn new(
        requests: Arc<dyn RequestRepository>,
        quotations: Arc<dyn QuotationRepository>,
        admin_id: impl Into<String>,
    ) -> Self {
        Self { requests, quotations, admin_id: admin_id.into() }
    }

    pub fn sql(pool: DbPool, admin_id: impl Into<String>) -> Self {
        Self::new(
            Arc::new(SqlRequestRepository::new(pool.clone())),
            Arc::new(SqlQuotationRepository::new(pool)),
            admin_id,
        )
    }

    pub fn in_memory(admin_id: impl Into<String>) -> Self {
        let repository = Arc::new(InMemoryDeskRepository::default());
        Self::new(repository.clone(), repository, admin_id)
    }

    pub fn admin_id(&self) -> &str {
        &self.admin_id
    }

    pub async fn create_request(
        &self,
        input: NewRequestInput,
    ) -> Result<QuoteRequest, ApplicationError> {
        input.check()?;

        let request =
            QuoteRequest::pending(input.name, input.email, input.description, now_for_storage());
        self.requests.insert(request.clone()).await?;

        info!(
            event_name = "desk.request.created",
            request_id = %request.id,
            "quotation request submitted"
        );
        Ok(request)
    }

    pub async fn list_requests(&self) -> Result<Vec<QuoteRequest>, ApplicationError> {
        Ok(self.requests.list_recent_first().await?)
    }

    pub async fn get_request(
        &self,
        id: &RequestId,
    ) -> Result<Option<QuoteRequest>, ApplicationError> {
        Ok(self.requests.find_by_id(id).await?)
    }

    pub async fn get_quotation(
        &self,
        request_id: &RequestId,
    ) -> Result<Option<Quotation>, ApplicationError> {
        Ok(self.quotations.find_by_request_id(request_id).await?)
    }

    pub async fn upsert_quotation(
        &self,
        request_id: RequestId,
        input: QuotationInput,
    ) -> Result<UpsertOutcome, ApplicationError> {
        let validated = input.into_validated()?;
        let priced = price_items(&validated.lines)?;
        let draft = QuotationDraft {
            request_id: request_id.clone(),
            admin_id: self.admin_id.clone(),
            notes: validated.notes,
            priced,
            submitted_at: now_for_storage(),
        };

        let outcome = match self.quotations.upsert(draft).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    event_name = "desk.quotation.rejected",
                    request_id = %request_id,
                    error = %error,
                    "quotation upsert failed"
                );
                return Err(error.into());
            }
        };
        outcome.quotation().verify_totals()?;

        let quotation = outcome.quotation();
        if outcome.was_created() {
            info!(
                event_name = "desk.quotation.created",
                request_id = %request_id,
                quotation_id = %quotation.id.0,
                item_count = quotation.items.len(),
                total_amount = %quotation.total_amount,
                "quotation created and request marked replied"
            );
        } else {
            info!(
                event_name = "desk.quotation.updated",
                request_id = %request_id,
                quotation_id = %quotation.id.0,
                item_count = quotation.items.len(),
                total_amount = %quotation.total_amount,
                "quotation items replaced"
            );
        }

        Ok(outcome)
    }

    /// Prices `input` exactly like [`Self::upsert_quotation`] without writing.
    pub fn preview(&self, input: QuotationInput) -> Result<PricedItems, ApplicationError> {
        let validated = input.into_validated()?;
        Ok(price_items(&validated.lines)?)
    }
}

// SQLite keeps microseconds; trimming here keeps returned values equal to stored ones.
fn now_for_storage() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
