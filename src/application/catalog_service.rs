use std::sync::Arc;

use chrono::Utc;
use log::info;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::{CatalogStore, CategoryStore};
use crate::domain::product::{
    slugify, Category, CategoryChanges, NewCategory, NewProduct, Product, ProductChanges,
    ProductDraft, ProductFilter,
};
use crate::domain::ListResult;

pub struct CatalogService {
    products: Arc<dyn CatalogStore>,
    categories: Arc<dyn CategoryStore>,
}

/// A path segment that is either a UUID or a slug.
fn parse_identifier(identifier: &str) -> Result<Uuid, &str> {
    Uuid::parse_str(identifier).map_err(|_| identifier)
}

/// `base`, or `base-<millis>` when `base` is already used by another row.
fn unique_slug<F>(base: String, taken_by_other: F) -> Result<String, DomainError>
where
    F: Fn(&str) -> Result<bool, DomainError>,
{
    if taken_by_other(&base)? {
        Ok(format!("{base}-{}", Utc::now().timestamp_millis()))
    } else {
        Ok(base)
    }
}

fn name_violation(name: &str) -> Option<DomainError> {
    if name.trim().is_empty() {
        Some(DomainError::invalid("name", "Name is required"))
    } else if slugify(name).is_empty() {
        Some(DomainError::invalid(
            "name",
            "Name must contain at least one letter or digit",
        ))
    } else {
        None
    }
}

impl CatalogService {
    pub fn new(products: Arc<dyn CatalogStore>, categories: Arc<dyn CategoryStore>) -> Self {
        Self {
            products,
            categories,
        }
    }

    pub fn list_products(&self, filter: &ProductFilter) -> Result<ListResult<Product>, DomainError> {
        self.products.find_active(filter)
    }

    /// Public lookup by id or slug; deactivated products are hidden.
    pub fn get_product(&self, identifier: &str) -> Result<Product, DomainError> {
        let found = match parse_identifier(identifier) {
            Ok(id) => self.products.find_by_id(id)?,
            Err(slug) => self.products.find_by_slug(slug)?,
        };
        found
            .filter(|p| p.is_active)
            .ok_or(DomainError::NotFound("Product"))
    }

    fn require_category(&self, category_id: Uuid) -> Result<(), DomainError> {
        match self.categories.find_by_id(category_id)? {
            Some(c) if c.is_active => Ok(()),
            _ => Err(DomainError::invalid("categoryId", "Category does not exist")),
        }
    }

    pub fn create_product(&self, draft: ProductDraft) -> Result<Product, DomainError> {
        draft.validate()?;
        self.require_category(draft.category_id)?;
        let slug = unique_slug(slugify(&draft.name), |s| {
            Ok(self.products.find_by_slug(s)?.is_some())
        })?;

        let product = self.products.create(NewProduct {
            id: Uuid::new_v4(),
            slug,
            draft,
        })?;
        info!("Product {} created ({})", product.slug, product.id);
        Ok(product)
    }

    /// Renaming a product regenerates its slug.
    pub fn update_product(
        &self,
        id: Uuid,
        mut changes: ProductChanges,
    ) -> Result<Product, DomainError> {
        changes.validate()?;
        if let Some(category_id) = changes.category_id {
            self.require_category(category_id)?;
        }
        if let Some(name) = &changes.name {
            changes.slug = Some(unique_slug(slugify(name), |s| {
                Ok(self.products.find_by_slug(s)?.is_some_and(|p| p.id != id))
            })?);
        }
        self.products
            .update(id, changes)?
            .ok_or(DomainError::NotFound("Product"))
    }

    pub fn delete_product(&self, id: Uuid) -> Result<(), DomainError> {
        if !self.products.deactivate(id)? {
            return Err(DomainError::NotFound("Product"));
        }
        info!("Product {id} deactivated");
        Ok(())
    }

    pub fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        self.categories.list_active()
    }

    pub fn get_category(&self, identifier: &str) -> Result<Category, DomainError> {
        let found = match parse_identifier(identifier) {
            Ok(id) => self.categories.find_by_id(id)?,
            Err(slug) => self.categories.find_by_slug(slug)?,
        };
        found
            .filter(|c| c.is_active)
            .ok_or(DomainError::NotFound("Category"))
    }

    pub fn create_category(
        &self,
        name: String,
        description: Option<String>,
    ) -> Result<Category, DomainError> {
        if let Some(violation) = name_violation(&name) {
            return Err(violation);
        }
        let slug = unique_slug(slugify(&name), |s| {
            Ok(self.categories.find_by_slug(s)?.is_some())
        })?;
        let category = self.categories.create(NewCategory {
            id: Uuid::new_v4(),
            name,
            slug,
            description,
        })?;
        info!("Category {} created ({})", category.slug, category.id);
        Ok(category)
    }

    pub fn update_category(
        &self,
        id: Uuid,
        mut changes: CategoryChanges,
    ) -> Result<Category, DomainError> {
        if let Some(name) = &changes.name {
            if let Some(violation) = name_violation(name) {
                return Err(violation);
            }
            changes.slug = Some(unique_slug(slugify(name), |s| {
                Ok(self.categories.find_by_slug(s)?.is_some_and(|c| c.id != id))
            })?);
        }
        self.categories
            .update(id, changes)?
            .ok_or(DomainError::NotFound("Category"))
    }

    pub fn delete_category(&self, id: Uuid) -> Result<(), DomainError> {
        if !self.categories.deactivate(id)? {
            return Err(DomainError::NotFound("Category"));
        }
        info!("Category {id} deactivated");
        Ok(())
    }
}
