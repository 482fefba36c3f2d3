pub mod auth;
pub mod categories;
pub mod extractors;
pub mod orders;
pub mod payments;
pub mod products;

use actix_web::{error, web, HttpRequest, HttpResponse};

use crate::domain::errors::DomainError;
use crate::errors::AppError;

/// Runs synchronous service code on actix's blocking pool.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    Ok(web::block(f)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??)
}

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String)),
    tag = "health"
)]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json("ok")
}

// Extractor failures go through the same JSON envelope as every other error.

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: error::JsonPayloadError, _req: &HttpRequest| {
        AppError::bad_request(format!("Invalid JSON body: {err}")).into()
    })
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err: error::PathError, _req: &HttpRequest| {
        AppError::bad_request(format!("Invalid path parameter: {err}")).into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: error::QueryPayloadError, _req: &HttpRequest| {
        AppError::bad_request(format!("Invalid query string: {err}")).into()
    })
}
