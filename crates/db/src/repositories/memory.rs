use std::collections::HashMap;

use tokio::sync::RwLock;

use quotedesk_core::domain::quotation::{Quotation, QuotationDraft, UpsertOutcome};
use quotedesk_core::domain::request::{QuoteRequest, RequestId};

use super::{QuotationRepository, RepositoryError, RequestRepository};

/// Backs both repositories with process-local maps. Quotations are keyed by
/// request id, which is what the one-quotation-per-request rule keys on.
#[derive(Default)]
pub struct InMemoryDeskRepository {
    requests: RwLock<HashMap<String, QuoteRequest>>,
    quotations: RwLock<HashMap<String, Quotation>>,
}

#[async_trait::async_trait]
impl RequestRepository for InMemoryDeskRepository {
    async fn insert(&self, request: QuoteRequest) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn find_by_id(&self, id: &RequestId) -> Result<Option<QuoteRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn list_recent_first(&self) -> Result<Vec<QuoteRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut listed: Vec<QuoteRequest> = requests.values().cloned().collect();
        listed.sort_by(|left, right| {
            right.created_at.cmp(&left.created_at).then_with(|| right.id.0.cmp(&left.id.0))
        });
        Ok(listed)
    }
}

#[async_trait::async_trait]
impl QuotationRepository for InMemoryDeskRepository {
    async fn find_by_request_id(
        &self,
        request_id: &RequestId,
    ) -> Result<Option<Quotation>, RepositoryError> {
        let quotations = self.quotations.read().await;
        Ok(quotations.get(&request_id.0).cloned())
    }

    async fn upsert(&self, draft: QuotationDraft) -> Result<UpsertOutcome, RepositoryError> {
        // Lock order: requests, then quotations.
        let mut requests = self.requests.write().await;
        let Some(request) = requests.get_mut(&draft.request_id.0) else {
            return Err(RepositoryError::UnknownRequest(draft.request_id.0));
        };
        let mut quotations = self.quotations.write().await;

        let outcome = match quotations.get_mut(&draft.request_id.0) {
            Some(existing) => {
                existing.replace_with(draft);
                UpsertOutcome::Updated(existing.clone())
            }
            None => {
                let quotation = Quotation::from_draft(draft);
                quotations.insert(quotation.request_id.0.clone(), quotation.clone());
                request.mark_replied();
                UpsertOutcome::Created(quotation)
            }
        };

        Ok(outcome)
    }
}
