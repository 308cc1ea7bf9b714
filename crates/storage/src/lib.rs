use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use shared::domain::{NewOrder, Order, OrderId, OrderStatus};

mod tables;

pub use tables::TableDirectory;

/// Process-lifetime order list. Cloning yields another handle onto the
/// same list.
#[derive(Clone, Default)]
pub struct OrderStore {
    inner: Arc<RwLock<OrderBook>>,
}

#[derive(Debug)]
struct OrderBook {
    orders: Vec<Order>,
    next_id: i64,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self {
            orders: Vec::new(),
            next_id: 1,
        }
    }
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every order, in creation order.
    pub async fn list_all(&self) -> Vec<Order> {
        self.inner.read().await.orders.clone()
    }

    pub async fn get(&self, id: OrderId) -> Option<Order> {
        let book = self.inner.read().await;
        book.orders.iter().find(|order| order.id == id).cloned()
    }

    /// Appends a `Pending` order under the next id. Ids are handed out under
    /// the write lock and never reused, deleted or not.
    pub async fn create(&self, input: NewOrder, customer_name: String) -> Order {
        let mut book = self.inner.write().await;
        let id = OrderId(book.next_id);
        book.next_id += 1;

        let order = Order {
            id,
            waiter_name: input.waiter_name_or_default(),
            table: input.table,
            customer_name,
            items: input.items,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        book.orders.push(order.clone());
        order
    }

    /// Overwrites the status of an existing order. Any status may follow any
    /// other; the lifecycle order is a client convention only.
    pub async fn update_status(&self, id: OrderId, status: OrderStatus) -> Option<Order> {
        let mut book = self.inner.write().await;
        let order = book.orders.iter_mut().find(|order| order.id == id)?;
        order.status = status;
        Some(order.clone())
    }

    pub async fn delete(&self, id: OrderId) -> bool {
        let mut book = self.inner.write().await;
        let before = book.orders.len();
        book.orders.retain(|order| order.id != id);
        book.orders.len() != before
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
