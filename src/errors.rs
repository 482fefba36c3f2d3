use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use log::error;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::domain::errors::{DomainError, FieldViolation};

/// JSON envelope returned for every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldViolation>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Vec<FieldViolation>,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Payment provider is not configured")]
    Misconfigured,

    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
            details: Vec::new(),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(details) => AppError::BadRequest {
                message: "Validation failed".to_string(),
                details,
            },
            DomainError::InsufficientStock { .. }
            | DomainError::ProductUnavailable(_)
            | DomainError::InvalidTransition { .. }
            | DomainError::EmptyCart => AppError::bad_request(e.to_string()),
            DomainError::NotFound(_) => AppError::NotFound(e.to_string()),
            DomainError::Unauthorized(msg) => AppError::Unauthorized(msg),
            DomainError::Forbidden => AppError::Forbidden,
            DomainError::Conflict(msg) => AppError::Conflict(msg),
            DomainError::ProviderMisconfigured => AppError::Misconfigured,
            DomainError::ProviderError(msg) => AppError::Provider(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Misconfigured | AppError::Provider(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::BadRequest { message, details } => ErrorBody {
                error: message.clone(),
                details: details.clone(),
            },
            AppError::Provider(_) => {
                error!("{self}");
                ErrorBody {
                    error: "Failed to create payment preference".to_string(),
                    details: Vec::new(),
                }
            }
            AppError::Internal(_) => {
                error!("{self}");
                ErrorBody {
                    error: "Internal server error".to_string(),
                    details: Vec::new(),
                }
            }
            other => ErrorBody {
                error: other.to_string(),
                details: Vec::new(),
            },
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::ResponseError;
    use uuid::Uuid;

    async fn body_json(err: AppError) -> serde_json::Value {
        let bytes = to_bytes(err.error_response().into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn not_found_returns_404() {
        let resp = AppError::NotFound("Order not found".to_string()).error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_error_returns_500() {
        let err = AppError::Internal("something went wrong".to_string());
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_error_display() {
        assert_eq!(
            AppError::Internal("msg".to_string()).to_string(),
            "Internal error: msg"
        );
    }

    #[test]
    fn domain_not_found_maps_to_app_not_found() {
        let app_err: AppError = DomainError::NotFound("Order").into();
        assert!(matches!(app_err, AppError::NotFound(ref m) if m == "Order not found"));
    }

    #[test]
    fn business_rule_violations_are_bad_requests() {
        let errors = [
            DomainError::InsufficientStock {
                product_id: Uuid::nil(),
                name: "Remera".to_string(),
                available: 1,
                requested: 2,
            },
            DomainError::ProductUnavailable(Uuid::nil()),
            DomainError::InvalidTransition {
                from: "pending".to_string(),
                to: "shipped".to_string(),
            },
            DomainError::EmptyCart,
        ];
        for e in errors {
            let app_err: AppError = e.into();
            assert_eq!(app_err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn auth_failures_map_to_401_and_403() {
        let unauthorized: AppError = DomainError::Unauthorized("bad token".to_string()).into();
        let forbidden: AppError = DomainError::Forbidden.into();
        assert_eq!(unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn duplicates_are_conflicts() {
        let app_err: AppError =
            DomainError::Conflict("Email is already registered".to_string()).into();
        assert_eq!(app_err.status_code(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn validation_details_are_listed_per_field() {
        let app_err: AppError = DomainError::Validation(vec![
            FieldViolation::new("items", "The order must contain at least one product"),
            FieldViolation::new("shippingAddress.city", "This field is required"),
        ])
        .into();

        let json = body_json(app_err).await;
        assert_eq!(json["error"], "Validation failed");
        assert_eq!(json["details"][1]["field"], "shippingAddress.city");
    }

    #[actix_web::test]
    async fn provider_and_internal_details_stay_server_side() {
        let provider =
            body_json(DomainError::ProviderError("status=401 token=abc".to_string()).into()).await;
        assert_eq!(provider["error"], "Failed to create payment preference");

        let internal = body_json(AppError::Internal("db exploded".to_string())).await;
        assert_eq!(internal["error"], "Internal server error");
        assert!(internal.get("details").is_none());
    }

    #[actix_web::test]
    async fn missing_provider_credentials_are_reported_as_such() {
        let err: AppError = DomainError::ProviderMisconfigured.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(err).await;
        assert_eq!(json["error"], "Payment provider is not configured");
    }

    #[actix_web::test]
    async fn insufficient_stock_message_names_the_product() {
        let json = body_json(
            DomainError::InsufficientStock {
                product_id: Uuid::nil(),
                name: "Bota".to_string(),
                available: 2,
                requested: 3,
            }
            .into(),
        )
        .await;
        assert_eq!(json["error"], "Insufficient stock for Bota. Available: 2");
    }
}
