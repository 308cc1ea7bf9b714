use shared::{
    domain::{NewOrder, Order, OrderId, OrderStatus, Table},
    error::ApiError,
    protocol::{OrderDeleted, ServerEvent, StatusUpdate},
};
use storage::{OrderStore, TableDirectory};
use tokio::sync::broadcast;
use tracing::info;

mod feed;

pub use feed::{OrderFeed, PublishGuard};

pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct ApiContext {
    pub orders: OrderStore,
    pub tables: TableDirectory,
    pub feed: OrderFeed,
}

impl ApiContext {
    pub fn new(tables: TableDirectory, event_capacity: usize) -> Self {
        Self {
            orders: OrderStore::new(),
            tables,
            feed: OrderFeed::new(event_capacity),
        }
    }
}

pub async fn list_orders(ctx: &ApiContext) -> Vec<Order> {
    ctx.orders.list_all().await
}

pub async fn get_order(ctx: &ApiContext, order_id: OrderId) -> Result<Order, ApiError> {
    ctx.orders.get(order_id).await.ok_or_else(ApiError::not_found)
}

pub async fn create_order(ctx: &ApiContext, input: NewOrder) -> Order {
    let customer_name = ctx.tables.customer_name_for(&input.table);
    let feed = ctx.feed.lock().await;
    let order = ctx.orders.create(input, customer_name).await;
    let delivered = feed.publish(ServerEvent::OrderCreated(order.clone()));
    info!(
        order_id = order.id.0,
        table = %order.table,
        items = order.items.len(),
        delivered,
        "order created"
    );
    order
}

pub async fn change_status(
    ctx: &ApiContext,
    order_id: OrderId,
    new_status: OrderStatus,
) -> Result<StatusUpdate, ApiError> {
    let feed = ctx.feed.lock().await;
    let order = ctx
        .orders
        .update_status(order_id, new_status)
        .await
        .ok_or_else(ApiError::not_found)?;
    let update = StatusUpdate {
        order_id,
        new_status,
        order,
    };
    let delivered = feed.publish(ServerEvent::StatusUpdated(update.clone()));
    info!(order_id = order_id.0, status = %new_status, delivered, "order status updated");
    Ok(update)
}

pub async fn delete_order(ctx: &ApiContext, order_id: OrderId) -> Result<(), ApiError> {
    let feed = ctx.feed.lock().await;
    if !ctx.orders.delete(order_id).await {
        return Err(ApiError::not_found());
    }
    let delivered = feed.publish(ServerEvent::OrderDeleted(OrderDeleted { order_id }));
    info!(order_id = order_id.0, delivered, "order deleted");
    Ok(())
}

pub fn list_tables(ctx: &ApiContext) -> Vec<Table> {
    ctx.tables.all()
}

/// Current orders plus a receiver positioned right after them: every
/// mutation not in the snapshot arrives on the receiver, and none twice.
pub async fn snapshot_and_subscribe(
    ctx: &ApiContext,
) -> (Vec<Order>, broadcast::Receiver<ServerEvent>) {
    let feed = ctx.feed.lock().await;
    let receiver = feed.subscribe();
    let orders = ctx.orders.list_all().await;
    (orders, receiver)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
