use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::CategoryStore;
use crate::domain::product::{Category, CategoryChanges, NewCategory};
use crate::schema::categories;

use super::models::{CategoryChangesRow, CategoryRow, NewCategoryRow};

pub struct DieselCategoryStore {
    pool: DbPool,
}

impl DieselCategoryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CategoryStore for DieselCategoryStore {
    fn list_active(&self) -> Result<Vec<Category>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = categories::table
            .filter(categories::is_active.eq(true))
            .order(categories::name.asc())
            .select(CategoryRow::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = categories::table
            .find(id)
            .select(CategoryRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(Category::from))
    }

    fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = categories::table
            .filter(categories::slug.eq(slug))
            .select(CategoryRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(Category::from))
    }

    fn create(&self, category: NewCategory) -> Result<Category, DomainError> {
        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(categories::table)
            .values(&NewCategoryRow {
                id: category.id,
                name: category.name,
                slug: category.slug,
                description: category.description,
            })
            .returning(CategoryRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn update(
        &self,
        id: Uuid,
        changes: CategoryChanges,
    ) -> Result<Option<Category>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = diesel::update(categories::table.find(id))
            .set(&CategoryChangesRow::from(changes))
            .returning(CategoryRow::as_returning())
            .get_result(&mut conn)
            .optional()?;
        Ok(row.map(Category::from))
    }

    fn deactivate(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(categories::table.find(id))
            .set((
                categories::is_active.eq(false),
                categories::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        Ok(updated > 0)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::DieselCategoryStore;
    use crate::domain::errors::DomainError;
    use crate::domain::ports::CategoryStore;
    use crate::domain::product::NewCategory;
    use crate::infrastructure::test_support::setup_db;

    fn category(name: &str, slug: &str) -> NewCategory {
        NewCategory {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn list_active_is_sorted_and_skips_deactivated() {
        let (_container, pool) = setup_db().await;
        let store = DieselCategoryStore::new(pool);
        store.create(category("Remeras", "remeras")).unwrap();
        let calzado = store.create(category("Calzado", "calzado")).unwrap();
        store.create(category("Pantalones", "pantalones")).unwrap();
        assert!(store.deactivate(calzado.id).unwrap());

        let names: Vec<_> = store
            .list_active()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Pantalones", "Remeras"]);
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_conflict() {
        let (_container, pool) = setup_db().await;
        let store = DieselCategoryStore::new(pool);
        store.create(category("Remeras", "remeras")).unwrap();

        let err = store.create(category("Remeras 2", "remeras")).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn find_by_slug_returns_the_row() {
        let (_container, pool) = setup_db().await;
        let store = DieselCategoryStore::new(pool);
        let created = store.create(category("Calzado", "calzado")).unwrap();

        let found = store.find_by_slug("calzado").unwrap().expect("should exist");
        assert_eq!(found.id, created.id);
        assert!(store.find_by_slug("nope").unwrap().is_none());
    }
}
