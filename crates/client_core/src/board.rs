use shared::{
    domain::{Order, OrderId, OrderStatus},
    protocol::ServerEvent,
};

/// Local copy of the server's order list, kept current by feeding it every
/// event the realtime session yields.
#[derive(Debug, Clone, Default)]
pub struct OrderBoard {
    orders: Vec<Order>,
}

impl OrderBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one server event into the board. Returns whether the list
    /// changed.
    pub fn apply(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::InitialOrders(orders) => {
                self.orders = orders.clone();
                true
            }
            ServerEvent::OrderCreated(order) => {
                if self.get(order.id).is_some() {
                    return false;
                }
                self.orders.push(order.clone());
                true
            }
            ServerEvent::StatusUpdated(update) => {
                match self.orders.iter_mut().find(|o| o.id == update.order_id) {
                    Some(existing) => {
                        *existing = update.order.clone();
                        true
                    }
                    None => false,
                }
            }
            ServerEvent::OrderDeleted(deleted) => {
                let before = self.orders.len();
                self.orders.retain(|order| order.id != deleted.order_id);
                self.orders.len() != before
            }
            ServerEvent::Error(_) => false,
        }
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| order.id == id)
    }

    /// Orders in one lifecycle stage, oldest first. This is the kitchen's
    /// column view.
    pub fn by_status(&self, status: OrderStatus) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(move |order| order.status == status)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/board_tests.rs"]
mod tests;
