use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::product::{Product, ProductChanges, ProductDraft, ProductFilter};
use crate::domain::PageRequest;
use crate::errors::{AppError, ErrorBody};
use crate::state::AppState;

use super::blocking;
use super::extractors::AdminUser;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "15999.00")]
    pub price: BigDecimal,
    pub category_id: Uuid,
    pub stock: i32,
    pub image: String,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        ProductResponse {
            id: p.id,
            name: p.name,
            slug: p.slug,
            description: p.description,
            price: p.price,
            category_id: p.category_id,
            stock: p.stock,
            image: p.image,
            sizes: p.sizes,
            colors: p.colors,
            is_active: p.is_active,
            is_featured: p.is_featured,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListProductsParams {
    /// Category id or slug.
    pub category: Option<String>,
    /// Case-insensitive match on name or description.
    pub search: Option<String>,
    #[param(value_type = Option<String>)]
    pub min_price: Option<BigDecimal>,
    #[param(value_type = Option<String>)]
    pub max_price: Option<BigDecimal>,
    pub featured: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListProductsResponse {
    pub items: Vec<ProductResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub price: BigDecimal,
    pub category_id: Uuid,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
}

impl From<CreateProductRequest> for ProductDraft {
    fn from(body: CreateProductRequest) -> Self {
        ProductDraft {
            name: body.name,
            description: body.description,
            price: body.price,
            category_id: body.category_id,
            stock: body.stock,
            image: body.image,
            sizes: body.sizes,
            colors: body.colors,
            is_active: body.is_active,
            is_featured: body.is_featured,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<BigDecimal>,
    pub category_id: Option<Uuid>,
    pub stock: Option<i32>,
    pub image: Option<String>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

impl From<UpdateProductRequest> for ProductChanges {
    fn from(body: UpdateProductRequest) -> Self {
        ProductChanges {
            name: body.name,
            slug: None,
            description: body.description,
            price: body.price,
            category_id: body.category_id,
            stock: body.stock,
            image: body.image,
            sizes: body.sizes,
            colors: body.colors,
            is_active: body.is_active,
            is_featured: body.is_featured,
        }
    }
}

/// GET /products
#[utoipa::path(
    get,
    path = "/products",
    params(ListProductsParams),
    responses(
        (status = 200, description = "Active products, newest first", body = ListProductsResponse),
        (status = 404, description = "Unknown category", body = ErrorBody),
    ),
    tag = "products"
)]
pub async fn list_products(
    state: web::Data<AppState>,
    query: web::Query<ListProductsParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = PageRequest::new(params.page, params.limit);

    let result = blocking(move || {
        let category_id = match params.category.as_deref().filter(|c| !c.is_empty()) {
            Some(identifier) => Some(state.catalog.get_category(identifier)?.id),
            None => None,
        };
        state.catalog.list_products(&ProductFilter {
            category_id,
            search: params.search.filter(|s| !s.trim().is_empty()),
            min_price: params.min_price,
            max_price: params.max_price,
            featured_only: params.featured.unwrap_or(false),
            page,
        })
    })
    .await?;

    Ok(HttpResponse::Ok().json(ListProductsResponse {
        pages: page.pages(result.total),
        items: result.items.into_iter().map(ProductResponse::from).collect(),
        total: result.total,
        page: page.page,
        limit: page.limit,
    }))
}

/// GET /products/{id}
///
/// Accepts either the product UUID or its slug.
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = String, Path, description = "Product UUID or slug")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found", body = ErrorBody),
    ),
    tag = "products"
)]
pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let identifier = path.into_inner();
    let product = blocking(move || state.catalog.get_product(&identifier)).await?;
    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// POST /products
#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid product", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn create_product(
    state: web::Data<AppState>,
    _admin: AdminUser,
    body: web::Json<CreateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let draft = ProductDraft::from(body.into_inner());
    let product = blocking(move || state.catalog.create_product(draft)).await?;
    Ok(HttpResponse::Created().json(ProductResponse::from(product)))
}

/// PUT /products/{id}
#[utoipa::path(
    put,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid change", body = ErrorBody),
        (status = 404, description = "Product not found", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn update_product(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let changes = ProductChanges::from(body.into_inner());
    let product = blocking(move || state.catalog.update_product(id, changes)).await?;
    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// DELETE /products/{id}
///
/// Soft delete: the product stays referenced by past orders.
#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 204, description = "Product deactivated"),
        (status = 404, description = "Product not found", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn delete_product(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    blocking(move || state.catalog.delete_product(id)).await?;
    Ok(HttpResponse::NoContent().finish())
}
