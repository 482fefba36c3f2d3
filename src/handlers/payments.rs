use actix_web::{web, HttpRequest, HttpResponse};
use bigdecimal::BigDecimal;
use log::info;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::payment::{Checkout, PreferenceItem};
use crate::errors::{AppError, ErrorBody};
use crate::state::AppState;

fn default_qty() -> i32 {
    1
}

/// One cart line as the storefront client sends it.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PreferenceItemDto {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_qty")]
    pub qty: i32,
    #[schema(value_type = String, example = "1500.00")]
    pub price: BigDecimal,
    pub image: Option<String>,
}

impl From<PreferenceItemDto> for PreferenceItem {
    fn from(dto: PreferenceItemDto) -> Self {
        PreferenceItem {
            title: dto.name,
            quantity: dto.qty,
            unit_price: dto.price,
            picture_url: dto.image.filter(|i| !i.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePreferenceRequest {
    #[serde(default)]
    pub items: Vec<PreferenceItemDto>,
    pub payer_email: Option<String>,
    /// Sent to the provider as the external reference; any id or order number.
    pub order_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PreferenceResponse {
    #[serde(rename = "preferenceId")]
    pub preference_id: String,
    pub init_point: Option<String>,
    pub sandbox_init_point: Option<String>,
    pub redirect_url: String,
}

impl From<Checkout> for PreferenceResponse {
    fn from(c: Checkout) -> Self {
        PreferenceResponse {
            preference_id: c.preference_id,
            init_point: c.init_point,
            sandbox_init_point: c.sandbox_init_point,
            redirect_url: c.redirect_url,
        }
    }
}

/// POST /payments/create-preference
#[utoipa::path(
    post,
    path = "/payments/create-preference",
    request_body = CreatePreferenceRequest,
    responses(
        (status = 200, description = "Hosted checkout created", body = PreferenceResponse),
        (status = 400, description = "Empty cart or invalid line", body = ErrorBody),
        (status = 500, description = "Provider not configured or unreachable", body = ErrorBody),
    ),
    tag = "payments"
)]
pub async fn create_preference(
    state: web::Data<AppState>,
    body: web::Json<CreatePreferenceRequest>,
) -> Result<HttpResponse, AppError> {
    let CreatePreferenceRequest {
        items,
        payer_email,
        order_id,
    } = body.into_inner();
    let items = items.into_iter().map(PreferenceItem::from).collect();

    let checkout = state
        .payments
        .create_preference(items, payer_email, order_id)
        .await?;
    Ok(HttpResponse::Ok().json(PreferenceResponse::from(checkout)))
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: Option<String>,
    action: Option<String>,
    data: Option<WebhookData>,
}

/// POST /payments/webhook
///
/// Acknowledged unconditionally. The notification is logged, not verified
/// against the provider, and does not change any order.
#[utoipa::path(
    post,
    path = "/payments/webhook",
    request_body(content = String, description = "Provider notification, any shape"),
    responses((status = 200, description = "Notification received")),
    tag = "payments"
)]
pub async fn webhook(req: HttpRequest, body: web::Bytes) -> HttpResponse {
    match serde_json::from_slice::<WebhookEvent>(&body) {
        Ok(event) => info!(
            "Payment notification type={} action={} id={} query={}",
            event.kind.as_deref().unwrap_or("-"),
            event.action.as_deref().unwrap_or("-"),
            event
                .data
                .and_then(|d| d.id)
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            req.query_string()
        ),
        Err(_) => info!(
            "Payment notification with unparsed body ({} bytes) query={}",
            body.len(),
            req.query_string()
        ),
    }
    HttpResponse::Ok().finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_reference_accepts_order_numbers() {
        let body: CreatePreferenceRequest = serde_json::from_value(serde_json::json!({
            "items": [{ "name": "Bota", "price": "1500" }],
            "orderId": "ORD-240307-0001"
        }))
        .unwrap();
        assert_eq!(body.order_id.as_deref(), Some("ORD-240307-0001"));
        assert_eq!(body.items[0].qty, 1);
    }
}
