pub mod category_repo;
pub mod memory;
pub mod mercadopago;
pub mod models;
pub mod order_repo;
pub mod product_repo;
pub mod user_repo;

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use log::warn;

use crate::domain::errors::DomainError;

/// Client-facing text for a unique violation. Constraint names stay in the logs.
pub(crate) fn conflict_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_email_key") => "Email is already registered",
        Some("products_slug_key") | Some("categories_slug_key") => "Slug already in use",
        Some("orders_order_number_key") => "Order number already taken",
        _ => "Duplicate value",
    }
}

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<DieselError> for DomainError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                let constraint = info.constraint_name();
                warn!(
                    "Unique violation on {}",
                    constraint.unwrap_or("unknown constraint")
                );
                DomainError::Conflict(conflict_message(constraint).to_string())
            }
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}
