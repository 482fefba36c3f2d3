use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::order::{
    Order, OrderItemRequest, OrderLine, OrderStatus, PaymentMethod, PaymentStatus, PlaceOrder,
    ShippingAddress, DEFAULT_COUNTRY,
};
use crate::domain::PageRequest;
use crate::errors::{AppError, ErrorBody};
use crate::state::AppState;

use super::blocking;
use super::extractors::{AdminUser, AuthenticatedUser};

// ── Request / response DTOs ──────────────────────────────────────────────────

/// Missing fields deserialize as empty strings and are reported by validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ShippingAddressDto {
    pub name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    /// Defaults to Argentina.
    pub country: Option<String>,
}

impl From<ShippingAddressDto> for ShippingAddress {
    fn from(dto: ShippingAddressDto) -> Self {
        ShippingAddress {
            name: dto.name,
            phone: dto.phone,
            street: dto.street,
            city: dto.city,
            state: dto.state,
            zip_code: dto.zip_code,
            country: dto
                .country
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
        }
    }
}

impl From<ShippingAddress> for ShippingAddressDto {
    fn from(address: ShippingAddress) -> Self {
        ShippingAddressDto {
            name: address.name,
            phone: address.phone,
            street: address.street,
            city: address.city,
            state: address.state,
            zip_code: address.zip_code,
            country: Some(address.country),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDto {
    #[serde(rename = "product", alias = "productId")]
    pub product_id: Uuid,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderItemDto>,
    pub shipping_address: Option<ShippingAddressDto>,
    pub notes: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

impl From<CreateOrderRequest> for PlaceOrder {
    fn from(body: CreateOrderRequest) -> Self {
        PlaceOrder {
            items: body
                .items
                .into_iter()
                .map(|i| OrderItemRequest {
                    product_id: i.product_id,
                    quantity: i.quantity,
                    size: i.size,
                    color: i.color,
                })
                .collect(),
            shipping_address: body.shipping_address.map(ShippingAddress::from),
            notes: body.notes.filter(|n| !n.trim().is_empty()),
            payment_method: body.payment_method.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineResponse {
    pub product_id: Uuid,
    pub name: String,
    #[schema(value_type = String, example = "1500.00")]
    pub price: BigDecimal,
    pub quantity: i32,
    pub image: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    #[schema(value_type = String)]
    pub subtotal: BigDecimal,
}

impl From<OrderLine> for OrderLineResponse {
    fn from(line: OrderLine) -> Self {
        OrderLineResponse {
            subtotal: line.line_total(),
            product_id: line.product_id,
            name: line.name,
            price: line.unit_price,
            quantity: line.quantity,
            image: line.image,
            size: line.size,
            color: line.color,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub items: Vec<OrderLineResponse>,
    #[schema(value_type = String, example = "3000.00")]
    pub total_amount: BigDecimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub payment_id: Option<String>,
    pub shipping_address: ShippingAddressDto,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        OrderResponse {
            id: order.id,
            order_number: order.order_number,
            user_id: order.user_id,
            items: order.lines.into_iter().map(OrderLineResponse::from).collect(),
            total_amount: order.total_amount,
            status: order.status,
            payment_status: order.payment_status,
            payment_method: order.payment_method,
            payment_id: order.payment_id,
            shipping_address: order.shipping_address.into(),
            notes: order.notes,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersParams {
    /// Only orders in this status.
    pub status: Option<OrderStatus>,
    /// Page number (1-based). Defaults to 1.
    pub page: Option<i64>,
    /// Number of items per page. Defaults to 20, maximum 100.
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Places an order for the caller. Prices come from the catalog, never from
/// the request; stock for every line is reserved before the order is stored.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 400, description = "Invalid request or insufficient stock", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn create_order(
    state: web::Data<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let request = PlaceOrder::from(body.into_inner());
    let order = blocking(move || state.orders.place_order(user.id, request)).await?;
    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders/my-orders
#[utoipa::path(
    get,
    path = "/orders/my-orders",
    responses(
        (status = 200, description = "The caller's orders, newest first", body = [OrderResponse]),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn my_orders(
    state: web::Data<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let orders = blocking(move || state.orders.list_my_orders(user.id)).await?;
    let body: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /orders/{id}
///
/// Visible to the order's owner and to admins.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 403, description = "Order belongs to someone else", body = ErrorBody),
        (status = 404, description = "Order not found", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let actor = user.actor();
    let order = blocking(move || state.orders.get_order_for(actor, id)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// Admin listing, newest first, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/orders",
    params(ListOrdersParams),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = PageRequest::new(params.page, params.limit);
    let status = params.status;

    let result = blocking(move || state.orders.list_orders(status, page)).await?;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        pages: page.pages(result.total),
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page: page.page,
        limit: page.limit,
    }))
}

/// PATCH /orders/{id}/status
#[utoipa::path(
    patch,
    path = "/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = OrderResponse),
        (status = 400, description = "Transition not allowed", body = ErrorBody),
        (status = 404, description = "Order not found", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn update_status(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let next = body.into_inner().status;
    let order = blocking(move || state.orders.update_status(id, next)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PATCH /orders/{id}/payment
#[utoipa::path(
    patch,
    path = "/orders/{id}/payment",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = UpdatePaymentRequest,
    responses(
        (status = 200, description = "Payment status recorded", body = OrderResponse),
        (status = 404, description = "Order not found", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn update_payment(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let UpdatePaymentRequest {
        payment_status,
        payment_id,
    } = body.into_inner();
    let order = blocking(move || {
        state
            .orders
            .update_payment(id, payment_status, payment_id.filter(|p| !p.trim().is_empty()))
    })
    .await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
