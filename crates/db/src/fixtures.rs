use rust_decimal::Decimal;
use serde::Serialize;

use quotedesk_core::errors::ApplicationError;
use quotedesk_core::input::{ItemInput, NewRequestInput, QuotationInput};

use crate::desk::QuotationDesk;

struct DemoRequest {
    name: &'static str,
    email: &'static str,
    description: &'static str,
    reply: Option<DemoReply>,
}

struct DemoReply {
    notes: &'static str,
    /// `(description, quantity, unit price mantissa, unit price scale)`
    items: &'static [(&'static str, i64, i64, u32)],
}

const DEMO_REQUESTS: &[DemoRequest] = &[
    DemoRequest {
        name: "Ada Lovelace",
        email: "ada.demo@quotedesk.invalid",
        description: "Company website with a contact form and a blog.",
        reply: Some(DemoReply {
            notes: "<p>Thanks for reaching out. Our offer is below.</p>",
            items: &[("Website design", 2, 100, 0), ("Hosting (12 months)", 1, 50, 0)],
        }),
    },
    DemoRequest {
        name: "Grace Hopper",
        email: "grace.demo@quotedesk.invalid",
        description: "Migrate our internal tooling to a hosted service.",
        reply: None,
    },
    DemoRequest {
        name: "Alan Turing",
        email: "alan.demo@quotedesk.invalid",
        description: "Quarterly maintenance contract for three kiosks.",
        reply: None,
    },
];

/// Deterministic demo data loaded through the desk, so it obeys the same
/// validation and pricing rules as live traffic.
pub struct DemoSeedDataset;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SeedResult {
    pub requests_created: usize,
    pub requests_skipped: usize,
    pub quotations_created: usize,
}

impl DemoSeedDataset {
    pub fn emails() -> Vec<&'static str> {
        DEMO_REQUESTS.iter().map(|demo| demo.email).collect()
    }

    /// Inserts any demo request whose e-mail is not already present. Running it
    /// twice leaves the data unchanged.
    pub async fn load(desk: &QuotationDesk) -> Result<SeedResult, ApplicationError> {
        let existing = desk.list_requests().await?;
        let mut result = SeedResult::default();

        for demo in DEMO_REQUESTS {
            if existing.iter().any(|request| request.email == demo.email) {
                result.requests_skipped += 1;
                continue;
            }

            let request = desk
                .create_request(NewRequestInput {
                    name: demo.name.to_string(),
                    email: demo.email.to_string(),
                    description: demo.description.to_string(),
                })
                .await?;
            result.requests_created += 1;

            if let Some(reply) = &demo.reply {
                desk.upsert_quotation(request.id, reply.to_input()).await?;
                result.quotations_created += 1;
            }
        }

        Ok(result)
    }
}

impl DemoReply {
    fn to_input(&self) -> QuotationInput {
        QuotationInput {
            notes: self.notes.to_string(),
            items: self
                .items
                .iter()
                .map(|(description, quantity, mantissa, scale)| ItemInput {
                    description: description.to_string(),
                    quantity: *quantity,
                    unit_price: Decimal::new(*mantissa, *scale),
                })
                .collect(),
        }
    }
}
