use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::request::RequestId;
use crate::errors::DomainError;
use crate::pricing::{line_amount, sum_amounts, PricedItem, PricedItems};

/// Admin identity recorded on quotations until real authentication exists.
pub const PLACEHOLDER_ADMIN_ID: &str = "admin-1";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuotationId(pub String);

impl QuotationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuotationItemId(pub String);

impl QuotationItemId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationItem {
    pub id: QuotationItemId,
    pub quotation_id: QuotationId,
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

impl QuotationItem {
    fn from_priced(quotation_id: &QuotationId, priced: PricedItem) -> Self {
        Self {
            id: QuotationItemId::generate(),
            quotation_id: quotation_id.clone(),
            description: priced.description,
            quantity: priced.quantity,
            unit_price: priced.unit_price,
            amount: priced.amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    pub id: QuotationId,
    pub request_id: RequestId,
    pub admin_id: String,
    pub notes: String,
    pub total_amount: Decimal,
    pub items: Vec<QuotationItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything a repository needs to create or replace the quotation of a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuotationDraft {
    pub request_id: RequestId,
    pub admin_id: String,
    pub notes: String,
    pub priced: PricedItems,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(Quotation),
    Updated(Quotation),
}

impl UpsertOutcome {
    pub fn quotation(&self) -> &Quotation {
        match self {
            Self::Created(quotation) | Self::Updated(quotation) => quotation,
        }
    }

    pub fn into_quotation(self) -> Quotation {
        match self {
            Self::Created(quotation) | Self::Updated(quotation) => quotation,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

impl Quotation {
    pub fn from_draft(draft: QuotationDraft) -> Self {
        let id = QuotationId::generate();
        let items = draft
            .priced
            .items
            .into_iter()
            .map(|priced| QuotationItem::from_priced(&id, priced))
            .collect();

        Self {
            id,
            request_id: draft.request_id,
            admin_id: draft.admin_id,
            notes: draft.notes,
            total_amount: draft.priced.total_amount,
            items,
            created_at: draft.submitted_at,
            updated_at: draft.submitted_at,
        }
    }

    /// Swaps in the draft's notes, items and total. Identity, owner and creation
    /// time are kept; every item gets a fresh id.
    pub fn replace_with(&mut self, draft: QuotationDraft) {
        let id = self.id.clone();
        self.notes = draft.notes;
        self.total_amount = draft.priced.total_amount;
        self.items = draft
            .priced
            .items
            .into_iter()
            .map(|priced| QuotationItem::from_priced(&id, priced))
            .collect();
        self.updated_at = draft.submitted_at;
    }

    pub fn verify_totals(&self) -> Result<(), DomainError> {
        for item in &self.items {
            if line_amount(item.quantity, item.unit_price) != Some(item.amount) {
                return Err(DomainError::InvariantViolation(format!(
                    "item `{}` amount {} does not equal quantity x unit price",
                    item.id.0, item.amount
                )));
            }
        }

        let sum = sum_amounts(self.items.iter().map(|item| item.amount));
        if sum != Some(self.total_amount) {
            return Err(DomainError::InvariantViolation(format!(
                "quotation `{}` total {} does not equal its item sum",
                self.id.0, self.total_amount
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use crate::domain::request::RequestId;
    use crate::pricing::{price_items, LineItem};

    use super::{Quotation, QuotationDraft, PLACEHOLDER_ADMIN_ID};

    fn draft(notes: &str, lines: &[(&str, u32, i64)]) -> QuotationDraft {
        let lines: Vec<LineItem> = lines
            .iter()
            .map(|(description, quantity, price)| LineItem {
                description: description.to_string(),
                quantity: *quantity,
                unit_price: Decimal::from(*price),
            })
            .collect();

        QuotationDraft {
            request_id: RequestId("req-123".to_string()),
            admin_id: PLACEHOLDER_ADMIN_ID.to_string(),
            notes: notes.to_string(),
            priced: price_items(&lines).expect("priced lines"),
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn from_draft_links_items_to_the_new_quotation() {
        let quotation = Quotation::from_draft(draft("<p>hi</p>", &[("a", 2, 100), ("b", 1, 50)]));

        assert_eq!(quotation.total_amount, Decimal::from(250));
        assert!(quotation.items.iter().all(|item| item.quotation_id == quotation.id));
        assert_eq!(quotation.admin_id, "admin-1");
        quotation.verify_totals().expect("fresh quotation keeps its totals");
    }

    #[test]
    fn replace_with_keeps_identity_and_swaps_everything_else() {
        let mut quotation = Quotation::from_draft(draft("first", &[("a", 2, 100)]));
        let original_id = quotation.id.clone();
        let original_item = quotation.items[0].id.clone();
        let created_at = quotation.created_at;

        let mut next = draft("second", &[("c", 1, 500)]);
        next.submitted_at = created_at + Duration::seconds(5);
        quotation.replace_with(next);

        assert_eq!(quotation.id, original_id);
        assert_eq!(quotation.created_at, created_at);
        assert_eq!(quotation.notes, "second");
        assert_eq!(quotation.total_amount, Decimal::from(500));
        assert_eq!(quotation.items.len(), 1);
        assert_ne!(quotation.items[0].id, original_item);
        assert!(quotation.updated_at > created_at);
    }

    #[test]
    fn verify_totals_flags_a_tampered_total() {
        let mut quotation = Quotation::from_draft(draft("", &[("a", 2, 100)]));
        quotation.total_amount = Decimal::from(1);

        assert!(quotation.verify_totals().is_err());
    }
}
