use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{
    format_order_number, order_total, NewOrder, Order, OrderLine, OrderStatus, PaymentStatus,
    PlaceOrder,
};
use crate::domain::ports::{CatalogStore, OrderRepository};
use crate::domain::product::Product;
use crate::domain::user::Actor;
use crate::domain::{ListResult, PageRequest};

pub struct OrderService {
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderRepository>,
}

impl OrderService {
    pub fn new(catalog: Arc<dyn CatalogStore>, orders: Arc<dyn OrderRepository>) -> Self {
        Self { catalog, orders }
    }

    /// Prices the request against the catalog, reserves stock and persists the order.
    ///
    /// Stock is only touched once every line has been checked. A failure after
    /// that point gives back whatever was already reserved.
    pub fn place_order(&self, user_id: Uuid, request: PlaceOrder) -> Result<Order, DomainError> {
        request.validate()?;
        let PlaceOrder {
            items,
            shipping_address,
            notes,
            payment_method,
        } = request;
        let shipping_address = shipping_address
            .ok_or_else(|| DomainError::invalid("shippingAddress", "Shipping address is required"))?;

        // Combined demand per product, in first-seen order.
        let mut demand: Vec<(Uuid, i32)> = Vec::new();
        for item in &items {
            match demand.iter_mut().find(|(id, _)| *id == item.product_id) {
                Some((_, qty)) => *qty = qty.saturating_add(item.quantity),
                None => demand.push((item.product_id, item.quantity)),
            }
        }

        let mut products: HashMap<Uuid, Product> = HashMap::with_capacity(demand.len());
        for &(product_id, requested) in &demand {
            let product = self
                .catalog
                .find_by_id(product_id)?
                .filter(|p| p.is_active)
                .ok_or(DomainError::ProductUnavailable(product_id))?;
            if product.stock < requested {
                warn!(
                    "Rejected order for user {user_id}: {} has {} in stock, {requested} requested",
                    product.name, product.stock
                );
                return Err(DomainError::InsufficientStock {
                    product_id,
                    name: product.name,
                    available: product.stock,
                    requested,
                });
            }
            products.insert(product_id, product);
        }

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let product = products
                .get(&item.product_id)
                .ok_or(DomainError::ProductUnavailable(item.product_id))?;
            lines.push(OrderLine {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.price.clone(),
                quantity: item.quantity,
                image: Some(product.image.clone()).filter(|i| !i.is_empty()),
                size: item.size,
                color: item.color,
            });
        }
        let total_amount = order_total(&lines);

        self.reserve(&demand)?;

        let order = NewOrder {
            id: Uuid::new_v4(),
            order_number: String::new(),
            user_id,
            lines,
            total_amount,
            payment_method,
            shipping_address,
            notes,
        };
        match self.persist(order) {
            Ok(order) => {
                info!(
                    "Order {} placed by {} for {} ({} lines)",
                    order.order_number,
                    user_id,
                    order.total_amount,
                    order.lines.len()
                );
                Ok(order)
            }
            Err(e) => {
                self.release(&demand);
                Err(e)
            }
        }
    }

    fn reserve(&self, demand: &[(Uuid, i32)]) -> Result<(), DomainError> {
        for (applied, &(product_id, quantity)) in demand.iter().enumerate() {
            if let Err(e) = self.catalog.decrement_stock(product_id, quantity) {
                warn!("Stock reservation failed for product {product_id}: {e}");
                self.release(&demand[..applied]);
                return Err(e);
            }
        }
        Ok(())
    }

    fn release(&self, reserved: &[(Uuid, i32)]) {
        for &(product_id, quantity) in reserved {
            if let Err(e) = self.catalog.restore_stock(product_id, quantity) {
                error!("Failed to restore {quantity} units of product {product_id}: {e}");
            }
        }
    }

    /// Numbers the order from the per-day counter; a taken number is retried once.
    fn persist(&self, mut order: NewOrder) -> Result<Order, DomainError> {
        let mut retried = false;
        loop {
            let day = Utc::now().date_naive();
            let sequence = self.orders.next_sequence(day)?;
            order.order_number = format_order_number(day, sequence);
            match self.orders.insert(order.clone()) {
                Err(DomainError::Conflict(reason)) if !retried => {
                    warn!(
                        "Order number {} already taken ({reason}), retrying",
                        order.order_number
                    );
                    retried = true;
                }
                other => return other,
            }
        }
    }

    /// Owners see their own orders; admins see every order.
    pub fn get_order_for(&self, actor: Actor, id: Uuid) -> Result<Order, DomainError> {
        let order = self
            .orders
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("Order"))?;
        if order.user_id != actor.user_id && !actor.is_admin() {
            return Err(DomainError::Forbidden);
        }
        Ok(order)
    }

    pub fn list_my_orders(&self, user_id: Uuid) -> Result<Vec<Order>, DomainError> {
        self.orders.list_for_user(user_id)
    }

    pub fn list_orders(
        &self,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<ListResult<Order>, DomainError> {
        self.orders.list(status, page)
    }

    pub fn update_status(&self, id: Uuid, next: OrderStatus) -> Result<Order, DomainError> {
        let current = self
            .orders
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("Order"))?;
        if current.status.is_terminal() {
            warn!(
                "Order {} is {} and can no longer change (requested {next})",
                current.order_number, current.status
            );
        }
        if !current.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: current.status.to_string(),
                to: next.to_string(),
            });
        }

        let Some(updated) = self.orders.update_status(id, current.status, next)? else {
            // Lost the compare-and-set: report against whatever won.
            let latest = self
                .orders
                .find_by_id(id)?
                .ok_or(DomainError::NotFound("Order"))?;
            return Err(DomainError::InvalidTransition {
                from: latest.status.to_string(),
                to: next.to_string(),
            });
        };

        info!(
            "Order {} moved from {} to {}",
            updated.order_number, current.status, next
        );
        if next == OrderStatus::Cancelled {
            for line in &updated.lines {
                if let Err(e) = self.catalog.restore_stock(line.product_id, line.quantity) {
                    error!(
                        "Failed to restock product {} for cancelled order {}: {e}",
                        line.product_id, updated.order_number
                    );
                }
            }
        }
        if next == OrderStatus::Delivered && updated.payment_status != PaymentStatus::Approved {
            warn!(
                "Order {} delivered with payment status {}",
                updated.order_number, updated.payment_status
            );
        }
        Ok(updated)
    }

    pub fn update_payment(
        &self,
        id: Uuid,
        status: PaymentStatus,
        payment_id: Option<String>,
    ) -> Result<Order, DomainError> {
        let updated = self
            .orders
            .update_payment(id, status, payment_id)?
            .ok_or(DomainError::NotFound("Order"))?;
        info!(
            "Order {} payment status set to {}",
            updated.order_number, status
        );
        Ok(updated)
    }
}
