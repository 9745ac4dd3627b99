//! Entity records as persisted by the storage engines.
//!
//! These are plain data; all field validation happens in the domain services
//! before a record reaches a store, and the engines enforce the structural
//! invariants (uniqueness, referential integrity).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use common::{
    CartId, CartItemId, CategoryId, CommentId, CustomerId, DiscountId, Money, OrderId, OrderItemId,
    ProductId,
};

/// A product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    pub description: String,
    /// Featured product; must belong to this category's own product set.
    pub top_product: Option<ProductId>,
}

/// A discount attachable to many products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub id: DiscountId,
    /// Percentage off. Conventionally within [0, 50]; not enforced at write
    /// time.
    pub percentage: f64,
    pub description: String,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Money,
    pub inventory: i32,
    pub category_id: CategoryId,
    pub discount_ids: Vec<DiscountId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The product fields a cart exposes alongside each item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    /// Current price, re-read at query time. Carts price live; only placed
    /// orders freeze prices.
    pub price: Money,
}

/// A customer record. Always paired with exactly one [`Address`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub birth_date: Option<NaiveDate>,
}

/// A customer's address; keyed by the customer itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub customer_id: CustomerId,
    pub province: String,
    pub city: String,
    pub street: String,
}

/// Payment status of an order.
///
/// Any status may follow any other; no transition table is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Unpaid,
    Paid,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Unpaid => "unpaid",
            OrderStatus::Paid => "paid",
            OrderStatus::Canceled => "canceled",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(OrderStatus::Unpaid),
            "paid" => Ok(OrderStatus::Paid),
            "canceled" => Ok(OrderStatus::Canceled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A placed order. Append-only after creation except for `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line item within an order. Unique per (order, product).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Copied from the product at order creation and never re-derived, so the
    /// order keeps its historical price.
    pub unit_price: Money,
}

impl OrderItem {
    /// Total for this line (quantity × frozen unit price).
    pub fn total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A shopping cart. The id is an opaque server-generated token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub created_at: DateTime<Utc>,
}

/// A line item within a cart. Unique per (cart, product); duplicate adds
/// merge quantities rather than creating a second row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A cart item joined with its product's current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItemWithProduct {
    pub item: CartItem,
    pub product: ProductSnapshot,
}

impl CartItemWithProduct {
    /// Line total at the product's current price.
    pub fn total(&self) -> Money {
        self.product.price.multiply(self.item.quantity)
    }
}

/// Moderation status of a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentStatus {
    Waiting,
    Approved,
    NotApproved,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Waiting => "waiting",
            CommentStatus::Approved => "approved",
            CommentStatus::NotApproved => "not_approved",
        }
    }
}

impl std::str::FromStr for CommentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(CommentStatus::Waiting),
            "approved" => Ok(CommentStatus::Approved),
            "not_approved" => Ok(CommentStatus::NotApproved),
            other => Err(format!("unknown comment status: {other}")),
        }
    }
}

impl std::fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A product comment. Created as `Waiting` and promoted by moderation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub product_id: ProductId,
    pub name: String,
    pub body: String,
    pub status: CommentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_roundtrip() {
        for status in [OrderStatus::Unpaid, OrderStatus::Paid, OrderStatus::Canceled] {
            let parsed: OrderStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("refunded".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn comment_status_roundtrip() {
        for status in [
            CommentStatus::Waiting,
            CommentStatus::Approved,
            CommentStatus::NotApproved,
        ] {
            let parsed: CommentStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn order_item_total_uses_frozen_price() {
        let item = OrderItem {
            id: OrderItemId::new(),
            order_id: OrderId::new(),
            product_id: ProductId::new(),
            quantity: 3,
            unit_price: Money::from_cents(1250),
        };
        assert_eq!(item.total().cents(), 3750);
    }

    #[test]
    fn order_status_serializes_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Canceled).unwrap();
        assert_eq!(json, "\"canceled\"");
    }
}
