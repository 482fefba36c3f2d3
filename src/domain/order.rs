use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::{DomainError, FieldViolation};

pub const DEFAULT_COUNTRY: &str = "Argentina";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Forward-only lifecycle; cancellation is allowed until the order ships.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Mercadopago,
    Cash,
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Mercadopago => "mercadopago",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

macro_rules! impl_text_enum {
    ($ty:ty, $label:literal, [$($variant:path),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                [$($variant),+]
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| DomainError::Internal(format!("unknown {} '{}'", $label, s)))
            }
        }
    };
}

impl_text_enum!(
    OrderStatus,
    "order status",
    [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ]
);
impl_text_enum!(
    PaymentStatus,
    "payment status",
    [
        PaymentStatus::Pending,
        PaymentStatus::Approved,
        PaymentStatus::Rejected,
        PaymentStatus::Refunded,
    ]
);
impl_text_enum!(
    PaymentMethod,
    "payment method",
    [
        PaymentMethod::Mercadopago,
        PaymentMethod::Cash,
        PaymentMethod::Transfer,
    ]
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl ShippingAddress {
    fn collect_violations(&self, violations: &mut Vec<FieldViolation>) {
        let fields = [
            ("name", &self.name),
            ("phone", &self.phone),
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("zipCode", &self.zip_code),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                violations.push(FieldViolation::new(
                    format!("shippingAddress.{field}"),
                    "This field is required",
                ));
            }
        }
    }
}

/// One requested line of a checkout, before it is priced against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: Option<ShippingAddress>,
    pub notes: Option<String>,
    pub payment_method: PaymentMethod,
}

impl PlaceOrder {
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut violations = Vec::new();
        if self.items.is_empty() {
            violations.push(FieldViolation::new(
                "items",
                "The order must contain at least one product",
            ));
        }
        for (i, item) in self.items.iter().enumerate() {
            if item.quantity < 1 {
                violations.push(FieldViolation::new(
                    format!("items[{i}].quantity"),
                    "Quantity must be at least 1",
                ));
            }
        }
        match &self.shipping_address {
            Some(address) => address.collect_violations(&mut violations),
            None => violations.push(FieldViolation::new(
                "shippingAddress",
                "Shipping address is required",
            )),
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(violations))
        }
    }
}

/// Frozen copy of the product as it was sold.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub image: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl OrderLine {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * &BigDecimal::from(self.quantity)
    }
}

pub fn order_total(lines: &[OrderLine]) -> BigDecimal {
    lines
        .iter()
        .fold(BigDecimal::zero(), |acc, line| acc + line.line_total())
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub lines: Vec<OrderLine>,
    pub total_amount: BigDecimal,
    pub payment_method: PaymentMethod,
    pub shipping_address: ShippingAddress,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub lines: Vec<OrderLine>,
    pub total_amount: BigDecimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub payment_id: Option<String>,
    pub shipping_address: ShippingAddress,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `ORD-YYMMDD-NNNN`, where `sequence` is the 1-based count of orders that day.
pub fn format_order_number(day: NaiveDate, sequence: i32) -> String {
    format!("ORD-{}-{:04}", day.format("%y%m%d"), sequence)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: "Ana".to_string(),
            phone: "1155550000".to_string(),
            street: "Av. Siempre Viva 742".to_string(),
            city: "Córdoba".to_string(),
            state: "Córdoba".to_string(),
            zip_code: "5000".to_string(),
            country: DEFAULT_COUNTRY.to_string(),
        }
    }

    fn item(quantity: i32) -> OrderItemRequest {
        OrderItemRequest {
            product_id: Uuid::new_v4(),
            quantity,
            size: None,
            color: None,
        }
    }

    #[test]
    fn lifecycle_moves_forward_one_step_at_a_time() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));

        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Shipped.can_transition_to(Processing));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn cancellation_only_before_shipping() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
    }

    #[test]
    fn terminal_states_have_no_exit() {
        for status in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            assert!(status.is_terminal());
            for next in OrderStatus::ALL {
                assert!(!status.can_transition_to(next));
            }
        }
    }

    #[test]
    fn text_enums_parse_their_own_output() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert_eq!(
            PaymentStatus::from_str("refunded").unwrap(),
            PaymentStatus::Refunded
        );
        assert!(PaymentMethod::from_str("bitcoin").is_err());
    }

    #[test]
    fn order_number_is_zero_padded() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(format_order_number(day, 1), "ORD-240307-0001");
        assert_eq!(format_order_number(day, 42), "ORD-240307-0042");
    }

    #[test]
    fn total_is_sum_of_price_times_quantity() {
        let line = |price: &str, quantity| OrderLine {
            product_id: Uuid::new_v4(),
            name: "x".to_string(),
            unit_price: BigDecimal::from_str(price).unwrap(),
            quantity,
            image: None,
            size: None,
            color: None,
        };
        let lines = vec![line("1500", 2), line("99.99", 3), line("0.01", 1)];
        assert_eq!(order_total(&lines), BigDecimal::from_str("3299.98").unwrap());
        assert_eq!(order_total(&[]), BigDecimal::zero());
    }

    #[test]
    fn place_order_requires_items_and_address() {
        let request = PlaceOrder {
            items: vec![],
            shipping_address: None,
            notes: None,
            payment_method: PaymentMethod::default(),
        };
        let Err(DomainError::Validation(violations)) = request.validate() else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["items", "shippingAddress"]);
    }

    #[test]
    fn place_order_reports_each_bad_field() {
        let mut addr = address();
        addr.city = "  ".to_string();
        addr.zip_code = String::new();
        let request = PlaceOrder {
            items: vec![item(1), item(0)],
            shipping_address: Some(addr),
            notes: None,
            payment_method: PaymentMethod::Cash,
        };
        let Err(DomainError::Validation(violations)) = request.validate() else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "items[1].quantity",
                "shippingAddress.city",
                "shippingAddress.zipCode"
            ]
        );
    }

    #[test]
    fn complete_request_is_valid() {
        let request = PlaceOrder {
            items: vec![item(2)],
            shipping_address: Some(address()),
            notes: Some("ring twice".to_string()),
            payment_method: PaymentMethod::Mercadopago,
        };
        assert!(request.validate().is_ok());
    }
}
