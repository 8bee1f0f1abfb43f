//! Inbound payloads and their validation rules.
//!
//! Every write path validates here first; a payload that fails produces a
//! [`DomainError::Validation`] listing each offending field and nothing is
//! written.

use std::borrow::Cow;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::errors::{DomainError, FieldViolation};
use crate::pricing::LineItem;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewRequestInput {
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub description: String,
    #[serde(default)]
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub quantity: i64,
    #[validate(custom(function = "non_negative"))]
    pub unit_price: Decimal,
}

/// Notes plus line items as submitted by the admin. Client-sent amounts or
/// totals are not part of the shape and are dropped on deserialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuotationInput {
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<ItemInput>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedQuotation {
    pub notes: String,
    pub lines: Vec<LineItem>,
}

impl NewRequestInput {
    pub fn check(&self) -> Result<(), DomainError> {
        self.validate().map_err(|errors| DomainError::Validation(violations(&errors)))
    }
}

impl QuotationInput {
    pub fn into_validated(self) -> Result<ValidatedQuotation, DomainError> {
        let mut found = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => violations(&errors),
        };
        if self.items.is_empty() {
            found.push(FieldViolation::new("items", "at least one item is required"));
        }
        if !found.is_empty() {
            found.sort_by(|left, right| left.field.cmp(&right.field));
            return Err(DomainError::Validation(found));
        }

        let mut lines = Vec::with_capacity(self.items.len());
        for (index, item) in self.items.into_iter().enumerate() {
            let quantity = u32::try_from(item.quantity).map_err(|_| {
                DomainError::Validation(vec![FieldViolation::new(
                    format!("items[{index}].quantity"),
                    "is out of range",
                )])
            })?;
            lines.push(LineItem {
                description: item.description,
                quantity,
                unit_price: item.unit_price,
            });
        }

        Ok(ValidatedQuotation { notes: self.notes, lines })
    }
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("non_negative")
            .with_message(Cow::Borrowed("must not be negative")));
    }
    Ok(())
}

/// Flattens validator output into `field` / `items[1].unitPrice` style paths.
pub fn violations(errors: &ValidationErrors) -> Vec<FieldViolation> {
    let mut found = Vec::new();
    collect(String::new(), errors, &mut found);
    found.sort_by(|left, right| left.field.cmp(&right.field));
    found
}

fn collect(prefix: String, errors: &ValidationErrors, found: &mut Vec<FieldViolation>) {
    for (field, kind) in errors.errors() {
        let name = camel_case(&field.to_string());
        let path = if prefix.is_empty() { name } else { format!("{prefix}.{name}") };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    let reason = error
                        .message
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| error.code.to_string());
                    found.push(FieldViolation::new(path.clone(), reason));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(path, inner, found),
            ValidationErrorsKind::List(entries) => {
                for (index, inner) in entries {
                    collect(format!("{path}[{index}]"), inner, found);
                }
            }
        }
    }
}

fn camel_case(field: &str) -> String {
    let mut output = String::with_capacity(field.len());
    let mut upper_next = false;
    for ch in field.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            output.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            output.push(ch);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{ItemInput, NewRequestInput, QuotationInput};
    use crate::errors::DomainError;

    fn item(description: &str, quantity: i64, unit_price: Decimal) -> ItemInput {
        ItemInput { description: description.to_string(), quantity, unit_price }
    }

    fn fields(error: DomainError) -> Vec<String> {
        match error {
            DomainError::Validation(violations) => {
                violations.into_iter().map(|violation| violation.field).collect()
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn well_formed_request_passes() {
        let input = NewRequestInput {
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            description: "I need a website for my business".to_string(),
        };

        assert!(input.check().is_ok());
    }

    #[test]
    fn request_reports_every_bad_field() {
        let input = NewRequestInput {
            name: String::new(),
            email: "not-an-email".to_string(),
            description: String::new(),
        };

        let error = input.check().expect_err("invalid request");
        assert_eq!(fields(error), vec!["description", "email", "name"]);
    }

    #[test]
    fn missing_request_fields_become_field_violations() {
        let input: NewRequestInput =
            serde_json::from_str(r#"{"name":"Ada"}"#).expect("defaults fill missing fields");

        let error = input.check().expect_err("missing email and description");
        assert_eq!(fields(error), vec!["description", "email"]);
    }

    #[test]
    fn quotation_converts_into_lines() {
        let input = QuotationInput {
            notes: "<p>Thanks</p>".to_string(),
            items: vec![item("Item 1", 2, Decimal::from(100)), item("Item 2", 1, Decimal::from(50))],
        };

        let validated = input.into_validated().expect("valid quotation");
        assert_eq!(validated.notes, "<p>Thanks</p>");
        assert_eq!(validated.lines.len(), 2);
        assert_eq!(validated.lines[0].quantity, 2);
    }

    #[test]
    fn zero_quantity_and_negative_price_are_rejected_with_item_paths() {
        let input = QuotationInput {
            notes: String::new(),
            items: vec![
                item("ok", 1, Decimal::ONE),
                item("zero", 0, Decimal::ONE),
                item("negative", 1, Decimal::new(-1, 2)),
            ],
        };

        let error = input.into_validated().expect_err("invalid items");
        assert_eq!(fields(error), vec!["items[1].quantity", "items[2].unitPrice"]);
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let input =
            QuotationInput { notes: String::new(), items: vec![item("neg", -3, Decimal::ONE)] };

        let error = input.into_validated().expect_err("negative quantity");
        assert_eq!(fields(error), vec!["items[0].quantity"]);
    }

    #[test]
    fn quantity_bounds_follow_u32() {
        let largest = QuotationInput {
            notes: String::new(),
            items: vec![item("bulk", i64::from(u32::MAX), Decimal::ONE)],
        };
        let validated = largest.into_validated().expect("u32::MAX is accepted");
        assert_eq!(validated.lines[0].quantity, u32::MAX);

        let beyond = QuotationInput {
            notes: String::new(),
            items: vec![item("bulk", i64::from(u32::MAX) + 1, Decimal::ONE)],
        };
        let error = beyond.into_validated().expect_err("past u32::MAX");
        assert_eq!(fields(error), vec!["items[0].quantity"]);
    }

    #[test]
    fn free_items_are_allowed() {
        let input =
            QuotationInput { notes: String::new(), items: vec![item("gift", 1, Decimal::ZERO)] };

        assert!(input.into_validated().is_ok());
    }

    #[test]
    fn empty_item_list_is_rejected() {
        let input = QuotationInput { notes: "n".to_string(), items: Vec::new() };

        let error = input.into_validated().expect_err("no items");
        assert_eq!(fields(error), vec!["items"]);
    }

    #[test]
    fn client_sent_totals_are_ignored() {
        let input: QuotationInput = serde_json::from_str(
            r#"{
                "notes": "n",
                "totalAmount": 99999,
                "items": [{"description": "a", "quantity": 2, "unitPrice": 100, "amount": 1}]
            }"#,
        )
        .expect("unknown fields are dropped");

        let validated = input.into_validated().expect("valid");
        assert_eq!(validated.lines[0].unit_price, Decimal::from(100));
    }
}
