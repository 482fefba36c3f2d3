use std::time::Duration;

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::RunQueryDsl;

use crate::config::DatabaseSettings;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Sets a per-connection `statement_timeout` so no query can hang a worker.
#[derive(Debug)]
struct StatementTimeout(Duration);

impl CustomizeConnection<PgConnection, diesel::r2d2::Error> for StatementTimeout {
    fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), diesel::r2d2::Error> {
        diesel::sql_query(format!("SET statement_timeout = {}", self.0.as_millis()))
            .execute(conn)
            .map(|_| ())
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn create_pool(settings: &DatabaseSettings) -> Result<DbPool, r2d2::Error> {
    let manager = ConnectionManager::<PgConnection>::new(settings.url.expose());
    Pool::builder()
        .max_size(settings.pool_size)
        .connection_timeout(settings.timeout)
        .connection_customizer(Box::new(StatementTimeout(settings.timeout)))
        .build(manager)
}
