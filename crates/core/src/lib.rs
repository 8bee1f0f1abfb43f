pub mod config;
pub mod domain;
pub mod errors;
pub mod input;
pub mod pricing;

pub use domain::quotation::{
    Quotation, QuotationDraft, QuotationId, QuotationItem, QuotationItemId, UpsertOutcome,
    PLACEHOLDER_ADMIN_ID,
};
pub use domain::request::{QuoteRequest, RequestId, RequestStatus};
pub use errors::{ApplicationError, DomainError, FieldViolation, InterfaceError};
pub use input::{ItemInput, NewRequestInput, QuotationInput, ValidatedQuotation};
pub use pricing::{price_items, sum_amounts, LineItem, PricedItem, PricedItems};
