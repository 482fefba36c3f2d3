use bigdecimal::{BigDecimal, Zero};

use super::errors::{DomainError, FieldViolation};

/// One purchasable line as the payment provider sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceItem {
    pub title: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub picture_url: Option<String>,
}

impl PreferenceItem {
    pub fn validate_all(items: &[PreferenceItem]) -> Result<(), DomainError> {
        let mut violations = Vec::new();
        for (i, item) in items.iter().enumerate() {
            if item.title.trim().is_empty() {
                violations.push(FieldViolation::new(
                    format!("items[{i}].name"),
                    "Name is required",
                ));
            }
            if item.quantity < 1 {
                violations.push(FieldViolation::new(
                    format!("items[{i}].qty"),
                    "Quantity must be at least 1",
                ));
            }
            if item.unit_price < BigDecimal::zero() {
                violations.push(FieldViolation::new(
                    format!("items[{i}].price"),
                    "Price cannot be negative",
                ));
            }
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(violations))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackUrls {
    pub success: String,
    pub pending: String,
    pub failure: String,
}

/// Everything the provider needs to render a hosted checkout page.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceRequest {
    pub items: Vec<PreferenceItem>,
    pub currency: String,
    pub payer_email: Option<String>,
    pub back_urls: BackUrls,
    pub binary_mode: bool,
    pub statement_descriptor: String,
    pub notification_url: Option<String>,
    /// Caller-chosen reference echoed back by the provider, usually an order id or number.
    pub external_reference: Option<String>,
}

/// What the provider answers after creating a preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceCreated {
    pub id: String,
    pub init_point: Option<String>,
    pub sandbox_init_point: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub preference_id: String,
    pub init_point: Option<String>,
    pub sandbox_init_point: Option<String>,
    pub redirect_url: String,
}
