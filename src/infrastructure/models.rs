use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderLine, ShippingAddress};
use crate::domain::product::{Category, CategoryChanges, Product, ProductChanges};
use crate::domain::user::{ProfileChanges, User};
use crate::schema::{categories, order_counters, order_lines, orders, products, users};

// ── Products ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
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

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Product {
            id: r.id,
            name: r.name,
            slug: r.slug,
            description: r.description,
            price: r.price,
            category_id: r.category_id,
            stock: r.stock,
            image: r.image,
            sizes: r.sizes,
            colors: r.colors,
            is_active: r.is_active,
            is_featured: r.is_featured,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub category_id: Uuid,
    pub stock: i32,
    pub image: String,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub is_active: bool,
    pub is_featured: bool,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = products)]
pub struct ProductChangesRow {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub category_id: Option<Uuid>,
    pub stock: Option<i32>,
    pub image: Option<String>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductChanges> for ProductChangesRow {
    fn from(c: ProductChanges) -> Self {
        ProductChangesRow {
            name: c.name,
            slug: c.slug,
            description: c.description,
            price: c.price,
            category_id: c.category_id,
            stock: c.stock,
            image: c.image,
            sizes: c.sizes,
            colors: c.colors,
            is_active: c.is_active,
            is_featured: c.is_featured,
            updated_at: Utc::now(),
        }
    }
}

// ── Categories ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CategoryRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(r: CategoryRow) -> Self {
        Category {
            id: r.id,
            name: r.name,
            slug: r.slug,
            description: r.description,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = categories)]
pub struct NewCategoryRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = categories)]
pub struct CategoryChangesRow {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

impl From<CategoryChanges> for CategoryChangesRow {
    fn from(c: CategoryChanges) -> Self {
        CategoryChangesRow {
            name: c.name,
            slug: c.slug,
            description: c.description,
            is_active: c.is_active,
            updated_at: Utc::now(),
        }
    }
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub total_amount: BigDecimal,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub payment_id: Option<String>,
    pub ship_name: String,
    pub ship_phone: String,
    pub ship_street: String,
    pub ship_city: String,
    pub ship_state: String,
    pub ship_zip_code: String,
    pub ship_country: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    pub fn into_order(self, lines: Vec<OrderLineRow>) -> Result<Order, DomainError> {
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            lines: lines.into_iter().map(OrderLine::from).collect(),
            total_amount: self.total_amount,
            status: self.status.parse()?,
            payment_status: self.payment_status.parse()?,
            payment_method: self.payment_method.parse()?,
            payment_id: self.payment_id,
            shipping_address: ShippingAddress {
                name: self.ship_name,
                phone: self.ship_phone,
                street: self.ship_street,
                city: self.ship_city,
                state: self.ship_state,
                zip_code: self.ship_zip_code,
                country: self.ship_country,
            },
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub total_amount: BigDecimal,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub ship_name: String,
    pub ship_phone: String,
    pub ship_street: String,
    pub ship_city: String,
    pub ship_state: String,
    pub ship_zip_code: String,
    pub ship_country: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_lines)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub image: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<OrderLineRow> for OrderLine {
    fn from(l: OrderLineRow) -> Self {
        OrderLine {
            product_id: l.product_id,
            name: l.name,
            unit_price: l.unit_price,
            quantity: l.quantity,
            image: l.image,
            size: l.size,
            color: l.color,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_lines)]
pub struct NewOrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub image: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_counters)]
pub struct NewOrderCounterRow {
    pub day: NaiveDate,
    pub last_value: i32,
}

// ── Users ────────────────────────────────────────────────────────────────────

#[derive(Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DomainError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: r.id,
            email: r.email,
            password_hash: r.password_hash,
            name: r.name,
            phone: r.phone,
            address: r.address,
            role: r.role.parse()?,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: String,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = users)]
pub struct ProfileChangesRow {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProfileChanges> for ProfileChangesRow {
    fn from(c: ProfileChanges) -> Self {
        ProfileChangesRow {
            name: c.name,
            phone: c.phone,
            address: c.address,
            updated_at: Utc::now(),
        }
    }
}
