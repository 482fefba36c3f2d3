use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::{DomainError, FieldViolation};
use super::PageRequest;

pub const ALLOWED_SIZES: [&str; 6] = ["XS", "S", "M", "L", "XL", "XXL"];

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
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

/// Fields supplied by an admin when creating a product.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
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

impl ProductDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut violations = Vec::new();
        check_name(&self.name, &mut violations);
        check_price(&self.price, &mut violations);
        check_stock(self.stock, &mut violations);
        if self.image.trim().is_empty() {
            violations.push(FieldViolation::new("image", "Image is required"));
        }
        check_sizes(&self.sizes, &mut violations);
        into_result(violations)
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub id: Uuid,
    pub slug: String,
    pub draft: ProductDraft,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
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
}

impl ProductChanges {
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut violations = Vec::new();
        if let Some(name) = &self.name {
            check_name(name, &mut violations);
        }
        if let Some(price) = &self.price {
            check_price(price, &mut violations);
        }
        if let Some(stock) = self.stock {
            check_stock(stock, &mut violations);
        }
        if matches!(&self.image, Some(image) if image.trim().is_empty()) {
            violations.push(FieldViolation::new("image", "Image is required"));
        }
        if let Some(sizes) = &self.sizes {
            check_sizes(sizes, &mut violations);
        }
        into_result(violations)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub min_price: Option<BigDecimal>,
    pub max_price: Option<BigDecimal>,
    pub featured_only: bool,
    pub page: PageRequest,
}

impl ProductFilter {
    /// In-process evaluation of the filter, mirroring the SQL the Diesel store builds.
    pub fn matches(&self, product: &Product) -> bool {
        if !product.is_active {
            return false;
        }
        if self.category_id.is_some_and(|id| id != product.category_id) {
            return false;
        }
        if self.featured_only && !product.is_featured {
            return false;
        }
        if self.min_price.as_ref().is_some_and(|min| &product.price < min) {
            return false;
        }
        if self.max_price.as_ref().is_some_and(|max| &product.price > max) {
            return false;
        }
        match &self.search {
            Some(term) => {
                let term = term.to_lowercase();
                product.name.to_lowercase().contains(&term)
                    || product
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&term))
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Lower-case, ASCII-folded, dash-separated form of `name`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        let c = fold_accent(c);
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

fn check_name(name: &str, violations: &mut Vec<FieldViolation>) {
    if name.trim().is_empty() {
        violations.push(FieldViolation::new("name", "Name is required"));
    } else if slugify(name).is_empty() {
        violations.push(FieldViolation::new(
            "name",
            "Name must contain at least one letter or digit",
        ));
    }
}

fn check_price(price: &BigDecimal, violations: &mut Vec<FieldViolation>) {
    if price < &BigDecimal::zero() {
        violations.push(FieldViolation::new("price", "Price cannot be negative"));
    }
}

fn check_stock(stock: i32, violations: &mut Vec<FieldViolation>) {
    if stock < 0 {
        violations.push(FieldViolation::new("stock", "Stock cannot be negative"));
    }
}

fn check_sizes(sizes: &[String], violations: &mut Vec<FieldViolation>) {
    for (i, size) in sizes.iter().enumerate() {
        if !ALLOWED_SIZES.contains(&size.as_str()) {
            violations.push(FieldViolation::new(
                format!("sizes[{i}]"),
                format!("Size must be one of {}", ALLOWED_SIZES.join(", ")),
            ));
        }
    }
}

fn into_result(violations: Vec<FieldViolation>) -> Result<(), DomainError> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(DomainError::Validation(violations))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn draft() -> ProductDraft {
        ProductDraft {
            name: "Remera Amarilla".to_string(),
            description: None,
            price: BigDecimal::from_str("15999").unwrap(),
            category_id: Uuid::new_v4(),
            stock: 10,
            image: "remeraamarilla.png".to_string(),
            sizes: vec!["S".to_string(), "M".to_string()],
            colors: vec![],
            is_active: true,
            is_featured: false,
        }
    }

    #[test]
    fn slugify_folds_accents_and_collapses_separators() {
        assert_eq!(slugify("Pantalón  Azul!"), "pantalon-azul");
        assert_eq!(slugify("  --Bota de Cuero--  "), "bota-de-cuero");
        assert_eq!(slugify("Niño & Niña"), "nino-nina");
    }

    #[test]
    fn slugify_of_symbols_is_empty() {
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn valid_draft_passes() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn negative_price_and_stock_are_reported_per_field() {
        let mut d = draft();
        d.price = BigDecimal::from_str("-1").unwrap();
        d.stock = -3;
        let Err(DomainError::Validation(violations)) = d.validate() else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["price", "stock"]);
    }

    #[test]
    fn unknown_size_is_rejected() {
        let mut d = draft();
        d.sizes.push("XXXL".to_string());
        let Err(DomainError::Validation(violations)) = d.validate() else {
            panic!("expected validation error");
        };
        assert_eq!(violations[0].field, "sizes[2]");
    }

    #[test]
    fn empty_changes_are_valid() {
        assert!(ProductChanges::default().validate().is_ok());
    }

    #[test]
    fn filter_matches_on_price_range_and_search() {
        let now = Utc::now();
        let d = draft();
        let product = Product {
            id: Uuid::new_v4(),
            name: d.name,
            slug: "remera-amarilla".to_string(),
            description: Some("Algodón peinado".to_string()),
            price: d.price,
            category_id: d.category_id,
            stock: d.stock,
            image: d.image,
            sizes: d.sizes,
            colors: d.colors,
            is_active: true,
            is_featured: false,
            created_at: now,
            updated_at: now,
        };

        let mut filter = ProductFilter {
            min_price: Some(BigDecimal::from(10_000)),
            max_price: Some(BigDecimal::from(20_000)),
            search: Some("algodón".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&product));

        filter.featured_only = true;
        assert!(!filter.matches(&product));

        filter.featured_only = false;
        filter.category_id = Some(Uuid::new_v4());
        assert!(!filter.matches(&product));
    }
}
