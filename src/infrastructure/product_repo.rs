use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogStore;
use crate::domain::product::{NewProduct, Product, ProductChanges, ProductFilter};
use crate::domain::ListResult;
use crate::schema::products;

use super::models::{NewProductRow, ProductChangesRow, ProductRow};

pub struct DieselCatalogStore {
    pool: DbPool,
}

impl DieselCatalogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn filtered(filter: &ProductFilter) -> products::BoxedQuery<'static, Pg> {
    let mut query = products::table
        .filter(products::is_active.eq(true))
        .into_boxed();
    if let Some(category_id) = filter.category_id {
        query = query.filter(products::category_id.eq(category_id));
    }
    if let Some(min) = &filter.min_price {
        query = query.filter(products::price.ge(min.clone()));
    }
    if let Some(max) = &filter.max_price {
        query = query.filter(products::price.le(max.clone()));
    }
    if filter.featured_only {
        query = query.filter(products::is_featured.eq(true));
    }
    if let Some(term) = &filter.search {
        let pattern = format!("%{}%", escape_like(term));
        query = query.filter(
            products::name
                .ilike(pattern.clone())
                .or(products::description.ilike(pattern)),
        );
    }
    query
}

impl CatalogStore for DieselCatalogStore {
    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(Product::from))
    }

    fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = products::table
            .filter(products::slug.eq(slug))
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(Product::from))
    }

    fn find_active(&self, filter: &ProductFilter) -> Result<ListResult<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = filtered(filter).count().get_result(conn)?;

            let rows = filtered(filter)
                .select(ProductRow::as_select())
                .order(products::created_at.desc())
                .limit(filter.page.limit)
                .offset(filter.page.offset())
                .load(conn)?;

            Ok(ListResult {
                items: rows.into_iter().map(Product::from).collect(),
                total,
            })
        })
    }

    fn decrement_stock(&self, id: Uuid, amount: i32) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        // Single conditional UPDATE: the row lock taken by Postgres serializes
        // concurrent decrements of the same product.
        let updated = diesel::update(
            products::table
                .filter(products::id.eq(id))
                .filter(products::is_active.eq(true))
                .filter(products::stock.ge(amount)),
        )
        .set((
            products::stock.eq(products::stock - amount),
            products::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

        if updated == 1 {
            return Ok(());
        }

        let current = products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;
        match current {
            Some(p) if p.is_active => Err(DomainError::InsufficientStock {
                product_id: id,
                name: p.name,
                available: p.stock,
                requested: amount,
            }),
            _ => Err(DomainError::ProductUnavailable(id)),
        }
    }

    fn restore_stock(&self, id: Uuid, amount: i32) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(products::table.find(id))
            .set((
                products::stock.eq(products::stock + amount),
                products::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DomainError::NotFound("Product"));
        }
        Ok(())
    }

    fn create(&self, product: NewProduct) -> Result<Product, DomainError> {
        let mut conn = self.pool.get()?;
        let NewProduct { id, slug, draft } = product;
        let row = diesel::insert_into(products::table)
            .values(&NewProductRow {
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
            })
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = diesel::update(products::table.find(id))
            .set(&ProductChangesRow::from(changes))
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)
            .optional()?;
        Ok(row.map(Product::from))
    }

    fn deactivate(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(products::table.find(id))
            .set((
                products::is_active.eq(false),
                products::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        Ok(updated > 0)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;
    use std::thread;

    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    use super::DieselCatalogStore;
    use crate::domain::errors::DomainError;
    use crate::domain::ports::{CatalogStore, CategoryStore};
    use crate::domain::product::{
        NewCategory, NewProduct, ProductChanges, ProductDraft, ProductFilter,
    };
    use crate::infrastructure::category_repo::DieselCategoryStore;
    use crate::infrastructure::test_support::setup_db;

    fn seed_category(pool: &crate::db::DbPool) -> Uuid {
        let store = DieselCategoryStore::new(pool.clone());
        let id = Uuid::new_v4();
        store
            .create(NewCategory {
                id,
                name: "Remeras".to_string(),
                slug: format!("remeras-{id}"),
                description: None,
            })
            .expect("category create failed");
        id
    }

    fn new_product(category_id: Uuid, name: &str, price: &str, stock: i32) -> NewProduct {
        let id = Uuid::new_v4();
        NewProduct {
            id,
            slug: format!("{}-{}", crate::domain::product::slugify(name), id),
            draft: ProductDraft {
                name: name.to_string(),
                description: Some("algodón".to_string()),
                price: BigDecimal::from_str(price).expect("valid decimal"),
                category_id,
                stock,
                image: "img.png".to_string(),
                sizes: vec!["M".to_string()],
                colors: vec!["rojo".to_string()],
                is_active: true,
                is_featured: false,
            },
        }
    }

    #[tokio::test]
    async fn decrement_is_conditional_on_available_stock() {
        let (_container, pool) = setup_db().await;
        let category_id = seed_category(&pool);
        let store = DieselCatalogStore::new(pool);
        let product = store
            .create(new_product(category_id, "Remera", "1500", 5))
            .expect("create failed");

        store.decrement_stock(product.id, 3).expect("decrement failed");
        let err = store.decrement_stock(product.id, 3).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientStock { available: 2, requested: 3, .. }
        ));

        let reloaded = store.find_by_id(product.id).unwrap().unwrap();
        assert_eq!(reloaded.stock, 2);
    }

    #[tokio::test]
    async fn decrement_of_inactive_product_is_unavailable() {
        let (_container, pool) = setup_db().await;
        let category_id = seed_category(&pool);
        let store = DieselCatalogStore::new(pool);
        let product = store
            .create(new_product(category_id, "Bota", "79999", 10))
            .expect("create failed");
        assert!(store.deactivate(product.id).unwrap());

        let err = store.decrement_stock(product.id, 1).unwrap_err();
        assert!(matches!(err, DomainError::ProductUnavailable(id) if id == product.id));
    }

    #[tokio::test]
    async fn concurrent_decrements_never_oversell() {
        let (_container, pool) = setup_db().await;
        let category_id = seed_category(&pool);
        let store = Arc::new(DieselCatalogStore::new(pool));
        let product = store
            .create(new_product(category_id, "Zapatilla", "45999", 5))
            .expect("create failed");

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.decrement_stock(product.id, 3).is_ok())
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked"))
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(store.find_by_id(product.id).unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn restore_gives_stock_back() {
        let (_container, pool) = setup_db().await;
        let category_id = seed_category(&pool);
        let store = DieselCatalogStore::new(pool);
        let product = store
            .create(new_product(category_id, "Pantalón", "24999", 4))
            .expect("create failed");

        store.decrement_stock(product.id, 4).unwrap();
        store.restore_stock(product.id, 4).unwrap();
        assert_eq!(store.find_by_id(product.id).unwrap().unwrap().stock, 4);
    }

    #[tokio::test]
    async fn find_active_filters_and_paginates() {
        let (_container, pool) = setup_db().await;
        let category_id = seed_category(&pool);
        let other_category = seed_category(&pool);
        let store = DieselCatalogStore::new(pool);
        for (name, price) in [("Remera A", "100"), ("Remera B", "200"), ("Remera C", "300")] {
            store
                .create(new_product(category_id, name, price, 1))
                .unwrap();
        }
        store
            .create(new_product(other_category, "Gorra", "150", 1))
            .unwrap();

        let cheap = store
            .find_active(&ProductFilter {
                max_price: Some(BigDecimal::from(200)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(cheap.total, 3);

        let by_category = store
            .find_active(&ProductFilter {
                category_id: Some(category_id),
                page: crate::domain::PageRequest::new(Some(2), Some(2)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_category.total, 3);
        assert_eq!(by_category.items.len(), 1);

        let searched = store
            .find_active(&ProductFilter {
                search: Some("gorr".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(searched.total, 1);
        assert_eq!(searched.items[0].name, "Gorra");
    }

    #[tokio::test]
    async fn update_applies_only_present_fields() {
        let (_container, pool) = setup_db().await;
        let category_id = seed_category(&pool);
        let store = DieselCatalogStore::new(pool);
        let product = store
            .create(new_product(category_id, "Remera", "1500", 5))
            .unwrap();

        let updated = store
            .update(
                product.id,
                ProductChanges {
                    stock: Some(12),
                    ..Default::default()
                },
            )
            .unwrap()
            .expect("product should exist");
        assert_eq!(updated.stock, 12);
        assert_eq!(updated.name, "Remera");
        assert_eq!(updated.price, product.price);

        assert!(store
            .update(Uuid::new_v4(), ProductChanges::default())
            .unwrap()
            .is_none());
    }
}
