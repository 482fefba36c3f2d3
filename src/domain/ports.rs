use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use super::errors::DomainError;
use super::order::{NewOrder, Order, OrderStatus, PaymentStatus};
use super::payment::{PreferenceCreated, PreferenceRequest};
use super::product::{
    Category, CategoryChanges, NewCategory, NewProduct, Product, ProductChanges, ProductFilter,
};
use super::user::{NewUser, ProfileChanges, Role, User};
use super::{ListResult, PageRequest};

pub trait CatalogStore: Send + Sync + 'static {
    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
    fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, DomainError>;
    fn find_active(&self, filter: &ProductFilter) -> Result<ListResult<Product>, DomainError>;
    /// Atomically subtracts `amount` from an active product's stock.
    ///
    /// Fails with `InsufficientStock` (or `ProductUnavailable`) instead of
    /// clamping when the stock cannot cover `amount`.
    fn decrement_stock(&self, id: Uuid, amount: i32) -> Result<(), DomainError>;
    /// Gives back stock taken by `decrement_stock`.
    fn restore_stock(&self, id: Uuid, amount: i32) -> Result<(), DomainError>;
    fn create(&self, product: NewProduct) -> Result<Product, DomainError>;
    fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Option<Product>, DomainError>;
    fn deactivate(&self, id: Uuid) -> Result<bool, DomainError>;
}

pub trait CategoryStore: Send + Sync + 'static {
    fn list_active(&self) -> Result<Vec<Category>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, DomainError>;
    fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, DomainError>;
    fn create(&self, category: NewCategory) -> Result<Category, DomainError>;
    fn update(&self, id: Uuid, changes: CategoryChanges)
        -> Result<Option<Category>, DomainError>;
    fn deactivate(&self, id: Uuid) -> Result<bool, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Next value of the per-day order counter, starting at 1.
    fn next_sequence(&self, day: NaiveDate) -> Result<i32, DomainError>;
    /// Fails with `Conflict` when the order number is already taken.
    fn insert(&self, order: NewOrder) -> Result<Order, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, DomainError>;
    fn list(
        &self,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<ListResult<Order>, DomainError>;
    /// Compare-and-set on the status column. `None` when the order is missing
    /// or no longer in `from`.
    fn update_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, DomainError>;
    fn update_payment(
        &self,
        id: Uuid,
        status: PaymentStatus,
        payment_id: Option<String>,
    ) -> Result<Option<Order>, DomainError>;
}

pub trait UserRepository: Send + Sync + 'static {
    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError>;
    fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;
    /// Fails with `Conflict` when the email is already registered.
    fn create(&self, user: NewUser) -> Result<User, DomainError>;
    fn update_profile(&self, id: Uuid, changes: ProfileChanges)
        -> Result<Option<User>, DomainError>;
    /// Replaces password hash and role, and reactivates the account.
    fn set_credentials(
        &self,
        id: Uuid,
        password_hash: String,
        role: Role,
    ) -> Result<Option<User>, DomainError>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<PreferenceCreated, DomainError>;
}
