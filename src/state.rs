use std::sync::Arc;

use log::warn;

use crate::application::auth_service::AuthService;
use crate::application::catalog_service::CatalogService;
use crate::application::order_service::OrderService;
use crate::application::payment_service::PaymentService;
use crate::config::{AuthSettings, Config, PaymentSettings};
use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::{
    CatalogStore, CategoryStore, OrderRepository, PaymentGateway, UserRepository,
};
use crate::infrastructure::category_repo::DieselCategoryStore;
use crate::infrastructure::memory::{
    InMemoryCatalogStore, InMemoryCategoryStore, InMemoryOrderRepository, InMemoryUserRepository,
};
use crate::infrastructure::mercadopago::MercadoPagoGateway;
use crate::infrastructure::order_repo::DieselOrderRepository;
use crate::infrastructure::product_repo::DieselCatalogStore;
use crate::infrastructure::user_repo::DieselUserRepository;

/// Services shared by every worker, wired once at startup.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub catalog: Arc<CatalogService>,
    pub auth: Arc<AuthService>,
    pub payments: Arc<PaymentService>,
}

struct Stores {
    products: Arc<dyn CatalogStore>,
    categories: Arc<dyn CategoryStore>,
    orders: Arc<dyn OrderRepository>,
    users: Arc<dyn UserRepository>,
}

impl AppState {
    /// Postgres-backed stores plus the Mercado Pago gateway when a token is configured.
    pub fn postgres(pool: DbPool, config: &Config) -> Result<Self, DomainError> {
        let gateway: Option<Arc<dyn PaymentGateway>> = match &config.payments.access_token {
            Some(token) => Some(Arc::new(MercadoPagoGateway::new(
                &config.payments,
                token.clone(),
            )?)),
            None => {
                warn!("MP_ACCESS_TOKEN is not set; payment preferences are disabled");
                None
            }
        };
        let stores = Stores {
            products: Arc::new(DieselCatalogStore::new(pool.clone())),
            categories: Arc::new(DieselCategoryStore::new(pool.clone())),
            orders: Arc::new(DieselOrderRepository::new(pool.clone())),
            users: Arc::new(DieselUserRepository::new(pool)),
        };
        Ok(Self::assemble(
            stores,
            config.auth.clone(),
            config.payments.clone(),
            gateway,
        ))
    }

    /// Process-local stores, for tests and for running without a database.
    pub fn in_memory(
        auth: AuthSettings,
        payments: PaymentSettings,
        gateway: Option<Arc<dyn PaymentGateway>>,
    ) -> Self {
        let stores = Stores {
            products: Arc::new(InMemoryCatalogStore::new()),
            categories: Arc::new(InMemoryCategoryStore::new()),
            orders: Arc::new(InMemoryOrderRepository::new()),
            users: Arc::new(InMemoryUserRepository::new()),
        };
        Self::assemble(stores, auth, payments, gateway)
    }

    fn assemble(
        stores: Stores,
        auth: AuthSettings,
        payments: PaymentSettings,
        gateway: Option<Arc<dyn PaymentGateway>>,
    ) -> Self {
        Self {
            orders: Arc::new(OrderService::new(
                stores.products.clone(),
                stores.orders,
            )),
            catalog: Arc::new(CatalogService::new(stores.products, stores.categories)),
            auth: Arc::new(AuthService::new(stores.users, auth)),
            payments: Arc::new(PaymentService::new(gateway, payments)),
        }
    }
}
