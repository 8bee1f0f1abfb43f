use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, FieldViolation};

/// A validated quotation line before any amounts are derived.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedItems {
    pub items: Vec<PricedItem>,
    pub total_amount: Decimal,
}

/// `None` when the product leaves the range `Decimal` can represent.
pub fn line_amount(quantity: u32, unit_price: Decimal) -> Option<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity))
}

/// Derives every line amount and the total. Input order is kept.
///
/// Amounts that overflow are reported as field violations on the offending
/// line, or on `items` when only the total overflows.
pub fn price_items(lines: &[LineItem]) -> Result<PricedItems, DomainError> {
    let mut items = Vec::with_capacity(lines.len());
    let mut violations = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        match line_amount(line.quantity, line.unit_price) {
            Some(amount) => items.push(PricedItem {
                description: line.description.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                amount,
            }),
            None => violations.push(FieldViolation::new(
                format!("items[{index}].unitPrice"),
                "amount exceeds the supported range",
            )),
        }
    }
    if !violations.is_empty() {
        return Err(DomainError::Validation(violations));
    }

    let total_amount = sum_amounts(items.iter().map(|item| item.amount)).ok_or_else(|| {
        DomainError::Validation(vec![FieldViolation::new(
            "items",
            "total amount exceeds the supported range",
        )])
    })?;

    Ok(PricedItems { items, total_amount })
}

pub fn sum_amounts(amounts: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    amounts.into_iter().try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
}
