use async_trait::async_trait;
use thiserror::Error;

use quotedesk_core::domain::quotation::{Quotation, QuotationDraft, UpsertOutcome};
use quotedesk_core::domain::request::{QuoteRequest, RequestId};
use quotedesk_core::errors::ApplicationError;

pub mod memory;
pub mod quotation;
pub mod request;

pub use memory::InMemoryDeskRepository;
pub use quotation::SqlQuotationRepository;
pub use request::SqlRequestRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("request `{0}` does not exist")]
    UnknownRequest(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::UnknownRequest(id) => Self::UnknownRequest(id),
            other => Self::Persistence(other.to_string()),
        }
    }
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn insert(&self, request: QuoteRequest) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<QuoteRequest>, RepositoryError>;
    /// Newest first; equal timestamps fall back to descending id.
    async fn list_recent_first(&self) -> Result<Vec<QuoteRequest>, RepositoryError>;
}

#[async_trait]
pub trait QuotationRepository: Send + Sync {
    async fn find_by_request_id(
        &self,
        request_id: &RequestId,
    ) -> Result<Option<Quotation>, RepositoryError>;

    /// Creates the quotation for `draft.request_id` (flipping the request to
    /// `Replied`) or replaces the existing one's notes, total and items. Either
    /// branch commits atomically.
    async fn upsert(&self, draft: QuotationDraft) -> Result<UpsertOutcome, RepositoryError>;
}
