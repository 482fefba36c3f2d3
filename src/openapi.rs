use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(title = "Storefront API", description = "Catalog, checkout and order management"),
    paths(
        handlers::health,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::me,
        handlers::auth::update_me,
        handlers::categories::list_categories,
        handlers::categories::get_category,
        handlers::categories::create_category,
        handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::create_product,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::orders::create_order,
        handlers::orders::my_orders,
        handlers::orders::get_order,
        handlers::orders::list_orders,
        handlers::orders::update_status,
        handlers::orders::update_payment,
        handlers::payments::create_preference,
        handlers::payments::webhook,
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Accounts and tokens"),
        (name = "categories", description = "Product categories"),
        (name = "products", description = "Catalog"),
        (name = "orders", description = "Order placement and fulfilment"),
        (name = "payments", description = "Hosted checkout"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use utoipa::OpenApi;

    use super::ApiDoc;

    #[test]
    fn document_lists_order_routes_and_bearer_scheme() {
        let json = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert!(json["paths"]["/orders"]["post"].is_object());
        assert!(json["paths"]["/orders/{id}/status"]["patch"].is_object());
        assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
        assert!(json["components"]["schemas"]["OrderResponse"].is_object());
    }
}
