//! Client-side shopping cart.
//!
//! Lines merge by product id; the total is recomputed on every call so it can
//! never drift from the lines.

use bigdecimal::{BigDecimal, Zero};
use uuid::Uuid;

use super::order::OrderItemRequest;
use super::payment::PreferenceItem;

/// The product fields a cart line snapshots when it is first added.
#[derive(Debug, Clone, PartialEq)]
pub struct CartProduct {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product: CartProduct,
    pub quantity: i32,
}

impl CartLine {
    pub fn subtotal(&self) -> BigDecimal {
        &self.product.price * &BigDecimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one unit. A product already in the cart keeps its original snapshot.
    pub fn add(&mut self, product: CartProduct) {
        match self.lines.iter_mut().find(|l| l.product.id == product.id) {
            Some(line) => line.quantity += 1,
            None => self.lines.push(CartLine {
                product,
                quantity: 1,
            }),
        }
    }

    /// Removes one unit, dropping the line when it reaches zero.
    ///
    /// Returns `false` (and changes nothing) when the product is not in the cart.
    pub fn remove(&mut self, product_id: Uuid) -> bool {
        let Some(pos) = self.lines.iter().position(|l| l.product.id == product_id) else {
            return false;
        };
        if self.lines[pos].quantity <= 1 {
            self.lines.remove(pos);
        } else {
            self.lines[pos].quantity -= 1;
        }
        true
    }

    pub fn total(&self) -> BigDecimal {
        self.lines
            .iter()
            .fold(BigDecimal::zero(), |acc, line| acc + line.subtotal())
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn item_count(&self) -> i32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn to_order_items(&self) -> Vec<OrderItemRequest> {
        self.lines
            .iter()
            .map(|l| OrderItemRequest {
                product_id: l.product.id,
                quantity: l.quantity,
                size: None,
                color: None,
            })
            .collect()
    }

    pub fn to_preference_items(&self) -> Vec<PreferenceItem> {
        self.lines
            .iter()
            .map(|l| PreferenceItem {
                title: l.product.name.clone(),
                quantity: l.quantity,
                unit_price: l.product.price.clone(),
                picture_url: l.product.image.clone(),
            })
            .collect()
    }
}
