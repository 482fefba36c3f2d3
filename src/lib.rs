pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod openapi;
pub mod schema;
pub mod state;

use std::error::Error;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use db::{create_pool, DbPool};
pub use state::AppState;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    if !applied.is_empty() {
        log::info!("Applied {} migration(s)", applied.len());
    }
    Ok(())
}

/// Registers every API route. Expects `web::Data<AppState>` on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    use handlers::{auth, categories, orders, payments, products};

    cfg.app_data(handlers::json_config())
        .app_data(handlers::path_config())
        .app_data(handlers::query_config())
        .route("/health", web::get().to(handlers::health))
        .service(
            web::scope("/auth")
                .route("/register", web::post().to(auth::register))
                .route("/login", web::post().to(auth::login))
                .route("/me", web::get().to(auth::me))
                .route("/me", web::put().to(auth::update_me)),
        )
        .service(
            web::scope("/categories")
                .route("", web::get().to(categories::list_categories))
                .route("", web::post().to(categories::create_category))
                .route("/{id}", web::get().to(categories::get_category))
                .route("/{id}", web::put().to(categories::update_category))
                .route("/{id}", web::delete().to(categories::delete_category)),
        )
        .service(
            web::scope("/products")
                .route("", web::get().to(products::list_products))
                .route("", web::post().to(products::create_product))
                .route("/{id}", web::get().to(products::get_product))
                .route("/{id}", web::put().to(products::update_product))
                .route("/{id}", web::delete().to(products::delete_product)),
        )
        .service(
            web::scope("/orders")
                .route("", web::post().to(orders::create_order))
                .route("", web::get().to(orders::list_orders))
                // Must precede "/{id}".
                .route("/my-orders", web::get().to(orders::my_orders))
                .route("/{id}", web::get().to(orders::get_order))
                .route("/{id}/status", web::patch().to(orders::update_status))
                .route("/{id}/payment", web::patch().to(orders::update_payment)),
        )
        .service(
            web::scope("/payments")
                .route(
                    "/create-preference",
                    web::post().to(payments::create_preference),
                )
                .route("/webhook", web::post().to(payments::webhook)),
        );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let state = web::Data::new(state);
    let api_doc = openapi::ApiDoc::openapi();
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", api_doc.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
