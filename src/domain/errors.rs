use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// A single rejected input field, reported back to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed")]
    Validation(Vec<FieldViolation>),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden")]
    Forbidden,
    #[error("Insufficient stock for {name}. Available: {available}")]
    InsufficientStock {
        product_id: Uuid,
        name: String,
        available: i32,
        requested: i32,
    },
    #[error("Product {0} not available")]
    ProductUnavailable(Uuid),
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Payment provider is not configured")]
    ProviderMisconfigured,
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Payment provider error: {0}")]
    ProviderError(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation(vec![FieldViolation::new(field, message)])
    }
}
