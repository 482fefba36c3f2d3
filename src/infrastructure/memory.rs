//! Process-local implementations of the persistence ports.
//!
//! Each store owns its own lock; nothing here is global. Used by the HTTP
//! and service tests, and handy for running the API without Postgres.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{NewOrder, Order, OrderStatus, PaymentStatus};
use crate::domain::ports::{CatalogStore, CategoryStore, OrderRepository, UserRepository};
use crate::domain::product::{
    Category, CategoryChanges, NewCategory, NewProduct, Product, ProductChanges, ProductFilter,
};
use crate::domain::user::{NewUser, ProfileChanges, Role, User};
use crate::domain::{ListResult, PageRequest};

use super::conflict_message;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, DomainError> {
    mutex
        .lock()
        .map_err(|_| DomainError::Internal("in-memory store lock poisoned".to_string()))
}

fn paginate<T: Clone>(items: &[T], page: PageRequest) -> Vec<T> {
    items
        .iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .cloned()
        .collect()
}

#[derive(Default)]
pub struct InMemoryCatalogStore {
    products: Mutex<HashMap<Uuid, Product>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(lock(&self.products)?.get(&id).cloned())
    }

    fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, DomainError> {
        Ok(lock(&self.products)?
            .values()
            .find(|p| p.slug == slug)
            .cloned())
    }

    fn find_active(&self, filter: &ProductFilter) -> Result<ListResult<Product>, DomainError> {
        let products = lock(&self.products)?;
        let mut matching: Vec<Product> = products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(ListResult {
            total: matching.len() as i64,
            items: paginate(&matching, filter.page),
        })
    }

    fn decrement_stock(&self, id: Uuid, amount: i32) -> Result<(), DomainError> {
        let mut products = lock(&self.products)?;
        match products.get_mut(&id) {
            Some(p) if p.is_active && p.stock >= amount => {
                p.stock -= amount;
                p.updated_at = Utc::now();
                Ok(())
            }
            Some(p) if p.is_active => Err(DomainError::InsufficientStock {
                product_id: id,
                name: p.name.clone(),
                available: p.stock,
                requested: amount,
            }),
            _ => Err(DomainError::ProductUnavailable(id)),
        }
    }

    fn restore_stock(&self, id: Uuid, amount: i32) -> Result<(), DomainError> {
        let mut products = lock(&self.products)?;
        let product = products
            .get_mut(&id)
            .ok_or(DomainError::NotFound("Product"))?;
        product.stock = product
            .stock
            .checked_add(amount)
            .ok_or_else(|| DomainError::Internal(format!("stock overflow for product {id}")))?;
        product.updated_at = Utc::now();
        Ok(())
    }

    fn create(&self, product: NewProduct) -> Result<Product, DomainError> {
        let mut products = lock(&self.products)?;
        if products.values().any(|p| p.slug == product.slug) {
            return Err(DomainError::Conflict(
                conflict_message(Some("products_slug_key")).to_string(),
            ));
        }
        let now = Utc::now();
        let NewProduct { id, slug, draft } = product;
        let created = Product {
            id,
            name: draft.name,
            slug,
            description: draft.description,
            price: draft.price,
            category_id: draft.category_id,
            stock: draft.stock,
            image: draft.image,
            sizes: draft.sizes,
            colors: draft.colors,
            is_active: draft.is_active,
            is_featured: draft.is_featured,
            created_at: now,
            updated_at: now,
        };
        products.insert(id, created.clone());
        Ok(created)
    }

    fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Option<Product>, DomainError> {
        let mut products = lock(&self.products)?;
        if let Some(slug) = &changes.slug {
            if products.values().any(|p| &p.slug == slug && p.id != id) {
                return Err(DomainError::Conflict(
                    conflict_message(Some("products_slug_key")).to_string(),
                ));
            }
        }
        let Some(p) = products.get_mut(&id) else {
            return Ok(None);
        };
        let ProductChanges {
            name,
            slug,
            description,
            price,
            category_id,
            stock,
            image,
            sizes,
            colors,
            is_active,
            is_featured,
        } = changes;
        if let Some(v) = name {
            p.name = v;
        }
        if let Some(v) = slug {
            p.slug = v;
        }
        if let Some(v) = description {
            p.description = Some(v);
        }
        if let Some(v) = price {
            p.price = v;
        }
        if let Some(v) = category_id {
            p.category_id = v;
        }
        if let Some(v) = stock {
            p.stock = v;
        }
        if let Some(v) = image {
            p.image = v;
        }
        if let Some(v) = sizes {
            p.sizes = v;
        }
        if let Some(v) = colors {
            p.colors = v;
        }
        if let Some(v) = is_active {
            p.is_active = v;
        }
        if let Some(v) = is_featured {
            p.is_featured = v;
        }
        p.updated_at = Utc::now();
        Ok(Some(p.clone()))
    }

    fn deactivate(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut products = lock(&self.products)?;
        Ok(match products.get_mut(&id) {
            Some(p) => {
                p.is_active = false;
                p.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }
}

#[derive(Default)]
pub struct InMemoryCategoryStore {
    categories: Mutex<HashMap<Uuid, Category>>,
}

impl InMemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CategoryStore for InMemoryCategoryStore {
    fn list_active(&self) -> Result<Vec<Category>, DomainError> {
        let mut active: Vec<Category> = lock(&self.categories)?
            .values()
            .filter(|c| c.is_active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(active)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, DomainError> {
        Ok(lock(&self.categories)?.get(&id).cloned())
    }

    fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, DomainError> {
        Ok(lock(&self.categories)?
            .values()
            .find(|c| c.slug == slug)
            .cloned())
    }

    fn create(&self, category: NewCategory) -> Result<Category, DomainError> {
        let mut categories = lock(&self.categories)?;
        if categories.values().any(|c| c.slug == category.slug) {
            return Err(DomainError::Conflict(
                conflict_message(Some("categories_slug_key")).to_string(),
            ));
        }
        let now = Utc::now();
        let created = Category {
            id: category.id,
            name: category.name,
            slug: category.slug,
            description: category.description,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        categories.insert(created.id, created.clone());
        Ok(created)
    }

    fn update(
        &self,
        id: Uuid,
        changes: CategoryChanges,
    ) -> Result<Option<Category>, DomainError> {
        let mut categories = lock(&self.categories)?;
        if let Some(slug) = &changes.slug {
            if categories.values().any(|c| &c.slug == slug && c.id != id) {
                return Err(DomainError::Conflict(
                    conflict_message(Some("categories_slug_key")).to_string(),
                ));
            }
        }
        let Some(c) = categories.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = changes.name {
            c.name = v;
        }
        if let Some(v) = changes.slug {
            c.slug = v;
        }
        if let Some(v) = changes.description {
            c.description = Some(v);
        }
        if let Some(v) = changes.is_active {
            c.is_active = v;
        }
        c.updated_at = Utc::now();
        Ok(Some(c.clone()))
    }

    fn deactivate(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut categories = lock(&self.categories)?;
        Ok(match categories.get_mut(&id) {
            Some(c) => {
                c.is_active = false;
                c.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: Mutex<Vec<Order>>,
    counters: Mutex<HashMap<NaiveDate, i32>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn next_sequence(&self, day: NaiveDate) -> Result<i32, DomainError> {
        let mut counters = lock(&self.counters)?;
        let value = counters.entry(day).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    fn insert(&self, order: NewOrder) -> Result<Order, DomainError> {
        let mut orders = lock(&self.orders)?;
        if orders.iter().any(|o| o.order_number == order.order_number) {
            return Err(DomainError::Conflict(
                conflict_message(Some("orders_order_number_key")).to_string(),
            ));
        }
        let now = Utc::now();
        let created = Order {
            id: order.id,
            order_number: order.order_number,
            user_id: order.user_id,
            lines: order.lines,
            total_amount: order.total_amount,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: order.payment_method,
            payment_id: None,
            shipping_address: order.shipping_address,
            notes: order.notes,
            created_at: now,
            updated_at: now,
        };
        orders.push(created.clone());
        Ok(created)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(lock(&self.orders)?.iter().find(|o| o.id == id).cloned())
    }

    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, DomainError> {
        let orders = lock(&self.orders)?;
        Ok(Self::newest_first(
            orders.iter().filter(|o| o.user_id == user_id).cloned().collect(),
        ))
    }

    fn list(
        &self,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<ListResult<Order>, DomainError> {
        let orders = lock(&self.orders)?;
        let matching = Self::newest_first(
            orders
                .iter()
                .filter(|o| status.map_or(true, |s| o.status == s))
                .cloned()
                .collect(),
        );
        Ok(ListResult {
            total: matching.len() as i64,
            items: paginate(&matching, page),
        })
    }

    fn update_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, DomainError> {
        let mut orders = lock(&self.orders)?;
        Ok(orders
            .iter_mut()
            .find(|o| o.id == id && o.status == from)
            .map(|o| {
                o.status = to;
                o.updated_at = Utc::now();
                o.clone()
            }))
    }

    fn update_payment(
        &self,
        id: Uuid,
        status: PaymentStatus,
        payment_id: Option<String>,
    ) -> Result<Option<Order>, DomainError> {
        let mut orders = lock(&self.orders)?;
        Ok(orders.iter_mut().find(|o| o.id == id).map(|o| {
            o.payment_status = status;
            if payment_id.is_some() {
                o.payment_id = payment_id;
            }
            o.updated_at = Utc::now();
            o.clone()
        }))
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserRepository for InMemoryUserRepository {
    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        Ok(lock(&self.users)?.get(&id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let email = email.to_lowercase();
        Ok(lock(&self.users)?
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let mut users = lock(&self.users)?;
        let email = user.email.to_lowercase();
        if users.values().any(|u| u.email == email) {
            return Err(DomainError::Conflict(
                conflict_message(Some("users_email_key")).to_string(),
            ));
        }
        let now = Utc::now();
        let created = User {
            id: user.id,
            email,
            password_hash: user.password_hash,
            name: user.name,
            phone: user.phone,
            address: user.address,
            role: user.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, DomainError> {
        let mut users = lock(&self.users)?;
        Ok(users.get_mut(&id).map(|u| {
            if let Some(v) = changes.name {
                u.name = v;
            }
            if let Some(v) = changes.phone {
                u.phone = Some(v);
            }
            if let Some(v) = changes.address {
                u.address = Some(v);
            }
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    fn set_credentials(
        &self,
        id: Uuid,
        password_hash: String,
        role: Role,
    ) -> Result<Option<User>, DomainError> {
        let mut users = lock(&self.users)?;
        Ok(users.get_mut(&id).map(|u| {
            u.password_hash = password_hash;
            u.role = role;
            u.is_active = true;
            u.updated_at = Utc::now();
            u.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;
    use crate::domain::product::ProductDraft;

    fn product(slug: &str, stock: i32) -> NewProduct {
        NewProduct {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            draft: ProductDraft {
                name: "Bota".to_string(),
                description: None,
                price: BigDecimal::from(1500),
                category_id: Uuid::new_v4(),
                stock,
                image: "bota.png".to_string(),
                sizes: vec![],
                colors: vec![],
                is_active: true,
                is_featured: false,
            },
        }
    }

    #[test]
    fn restoring_past_the_stock_ceiling_fails_instead_of_wrapping() {
        let store = InMemoryCatalogStore::new();
        let created = store.create(product("bota", i32::MAX - 1)).unwrap();

        let err = store.restore_stock(created.id, 2).unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));
        assert_eq!(
            store.find_by_id(created.id).unwrap().unwrap().stock,
            i32::MAX - 1
        );
    }

    #[test]
    fn duplicate_slug_conflict_does_not_name_the_constraint() {
        let store = InMemoryCatalogStore::new();
        store.create(product("bota", 1)).unwrap();

        let err = store.create(product("bota", 1)).unwrap_err();
        let DomainError::Conflict(message) = err else {
            panic!("expected conflict");
        };
        assert_eq!(message, "Slug already in use");
    }
}
