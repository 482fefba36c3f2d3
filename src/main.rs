use std::io;

use dotenvy::dotenv;
use storefront_service::config::Config;
use storefront_service::{build_server, create_pool, run_migrations, AppState};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(io::Error::other)?;

    let pool = create_pool(&config.database).map_err(io::Error::other)?;
    run_migrations(&pool).map_err(io::Error::other)?;

    let state = AppState::postgres(pool, &config).map_err(io::Error::other)?;
    if let Some(admin) = &config.admin {
        let auth = state.auth.clone();
        let admin = admin.clone();
        actix_web::web::block(move || auth.ensure_admin(&admin))
            .await
            .map_err(io::Error::other)?
            .map_err(io::Error::other)?;
    }

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(state, &config.host, config.port)?.await
}
