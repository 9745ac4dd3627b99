//! Order service: finalized, price-frozen purchases.
//!
//! At creation the current product price is copied into each order item and
//! never re-derived, so the order keeps its historical prices no matter what
//! happens to the catalog afterwards.

use chrono::Utc;
use serde::Serialize;

use common::{CustomerId, Money, OrderId, OrderItemId};
use store::{CatalogStore, CustomerStore, Order, OrderItem, OrderStatus, OrderStore};

use crate::error::{DomainError, Result};

/// One requested line when placing an order.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: common::ProductId,
    pub quantity: u32,
}

/// An order with its frozen items and total.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub total_price: Money,
}

impl OrderView {
    fn new(order: Order, items: Vec<OrderItem>) -> Self {
        let total_price = items.iter().map(OrderItem::total).sum();
        OrderView {
            order,
            items,
            total_price,
        }
    }
}

/// Service for order capture and status updates.
pub struct OrderService<S> {
    store: S,
}

impl<S> OrderService<S>
where
    S: OrderStore + CatalogStore + CustomerStore,
{
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Places an order, snapshotting each product's price at this instant.
    ///
    /// Unknown customer or product, a non-positive quantity, and a product
    /// appearing twice are all validation errors; nothing is written unless
    /// every line is valid.
    #[tracing::instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn create_order(
        &self,
        customer_id: CustomerId,
        items: Vec<NewOrderItem>,
    ) -> Result<OrderView> {
        if items.is_empty() {
            return Err(DomainError::validation("items", "order must contain at least one item"));
        }
        if self.store.get_customer(customer_id).await?.is_none() {
            return Err(DomainError::validation(
                "customer_id",
                format!("unknown customer {customer_id}"),
            ));
        }

        let order_id = OrderId::new();
        let mut order_items = Vec::with_capacity(items.len());
        for (n, line) in items.iter().enumerate() {
            if line.quantity == 0 {
                return Err(DomainError::validation(
                    "items",
                    "quantity must be a positive integer",
                ));
            }
            if items[..n].iter().any(|other| other.product_id == line.product_id) {
                return Err(DomainError::validation(
                    "items",
                    format!("product {} appears more than once", line.product_id),
                ));
            }
            let product = self
                .store
                .get_product(line.product_id)
                .await?
                .ok_or_else(|| {
                    DomainError::validation("items", format!("unknown product {}", line.product_id))
                })?;
            order_items.push(OrderItem {
                id: OrderItemId::new(),
                order_id,
                product_id: product.id,
                quantity: line.quantity,
                // Snapshot: never recomputed from the live product.
                unit_price: product.price,
            });
        }

        let now = Utc::now();
        let order = Order {
            id: order_id,
            customer_id,
            status: OrderStatus::Unpaid,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_order(order.clone(), order_items.clone()).await?;
        metrics::counter!("orders_created_total").increment(1);

        Ok(OrderView::new(order, order_items))
    }

    pub async fn get_order(&self, id: OrderId) -> Result<OrderView> {
        let (order, items) = self
            .store
            .get_order(id)
            .await?
            .ok_or_else(|| DomainError::not_found("order", id))?;
        Ok(OrderView::new(order, items))
    }

    pub async fn list_orders(&self, customer_id: Option<CustomerId>) -> Result<Vec<OrderView>> {
        let orders = self.store.list_orders(customer_id).await?;
        Ok(orders
            .into_iter()
            .map(|(order, items)| OrderView::new(order, items))
            .collect())
    }

    /// Sets the order status. Any status may follow any other.
    #[tracing::instrument(skip(self))]
    pub async fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<OrderView> {
        self.store.set_order_status(id, status).await?;
        self.get_order(id).await
    }
}
