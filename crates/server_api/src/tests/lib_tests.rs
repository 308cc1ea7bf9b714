use super::*;
use shared::{
    domain::{OccupancyState, TableId},
    error::ErrorCode,
};
use tokio::sync::broadcast::error::TryRecvError;

fn context() -> ApiContext {
    let tables = TableDirectory::from_tables(vec![Table {
        id: TableId(1),
        table_number: 5,
        customer_name: "Luis Gomez".into(),
        capacity: 4,
        occupancy_state: OccupancyState::Occupied,
    }]);
    ApiContext::new(tables, 16)
}

fn burger_for(table: &str) -> NewOrder {
    NewOrder {
        table: table.into(),
        items: vec!["Burger".into()],
        waiter_name: None,
    }
}

#[tokio::test]
async fn create_order_resolves_customer_and_broadcasts_to_every_subscriber() {
    let ctx = context();
    let (_, mut first) = snapshot_and_subscribe(&ctx).await;
    let (_, mut second) = snapshot_and_subscribe(&ctx).await;
    let (_, mut third) = snapshot_and_subscribe(&ctx).await;

    let order = create_order(&ctx, burger_for("5")).await;
    assert_eq!(order.customer_name, "Luis Gomez");

    for receiver in [&mut first, &mut second, &mut third] {
        let event = receiver.try_recv().expect("delivered");
        assert_eq!(event, ServerEvent::OrderCreated(order.clone()));
        assert!(matches!(receiver.try_recv(), Err(TryRecvError::Empty)));
    }
}

#[tokio::test]
async fn unknown_table_gets_generic_customer_name() {
    let ctx = context();
    let order = create_order(&ctx, burger_for("42")).await;
    assert_eq!(order.customer_name, "Customer");
}

#[tokio::test]
async fn change_status_of_missing_order_is_not_found_and_silent() {
    let ctx = context();
    let (_, mut receiver) = snapshot_and_subscribe(&ctx).await;

    let err = change_status(&ctx, OrderId(7), OrderStatus::InPreparation)
        .await
        .expect_err("missing");
    assert_eq!(err.code, ErrorCode::NotFound);
    assert!(matches!(receiver.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn change_status_broadcasts_update_with_full_order() {
    let ctx = context();
    let order = create_order(&ctx, burger_for("5")).await;
    let (_, mut receiver) = snapshot_and_subscribe(&ctx).await;

    let update = change_status(&ctx, order.id, OrderStatus::InPreparation)
        .await
        .expect("update");
    assert_eq!(update.order.status, OrderStatus::InPreparation);
    assert_eq!(
        receiver.try_recv().expect("delivered"),
        ServerEvent::StatusUpdated(update)
    );
    assert_eq!(
        get_order(&ctx, order.id).await.expect("order").status,
        OrderStatus::InPreparation
    );
}

#[tokio::test]
async fn delete_order_broadcasts_once_and_then_reports_not_found() {
    let ctx = context();
    let order = create_order(&ctx, burger_for("5")).await;
    let (_, mut receiver) = snapshot_and_subscribe(&ctx).await;

    delete_order(&ctx, order.id).await.expect("deleted");
    assert_eq!(
        receiver.try_recv().expect("delivered"),
        ServerEvent::OrderDeleted(OrderDeleted { order_id: order.id })
    );

    let err = delete_order(&ctx, order.id).await.expect_err("gone");
    assert_eq!(err.code, ErrorCode::NotFound);
    assert!(get_order(&ctx, order.id).await.is_err());
}

#[tokio::test]
async fn snapshot_reflects_everything_before_subscription() {
    let ctx = context();
    create_order(&ctx, burger_for("1")).await;
    create_order(&ctx, burger_for("2")).await;

    let (snapshot, mut receiver) = snapshot_and_subscribe(&ctx).await;
    assert_eq!(snapshot.len(), 2);
    assert!(matches!(receiver.try_recv(), Err(TryRecvError::Empty)));

    let third = create_order(&ctx, burger_for("3")).await;
    assert_eq!(
        receiver.try_recv().expect("delivered"),
        ServerEvent::OrderCreated(third)
    );
}

#[tokio::test]
async fn concurrent_creates_are_broadcast_in_id_order() {
    let ctx = context();
    let (_, mut receiver) = snapshot_and_subscribe(&ctx).await;

    let mut handles = Vec::new();
    for i in 0..10 {
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            create_order(&ctx, burger_for(&i.to_string())).await
        }));
    }
    for handle in handles {
        handle.await.expect("task");
    }

    let mut seen = Vec::new();
    while let Ok(ServerEvent::OrderCreated(order)) = receiver.try_recv() {
        seen.push(order.id.0);
    }
    assert_eq!(seen, (1..=10).collect::<Vec<i64>>());
}

#[tokio::test]
async fn list_tables_exposes_directory() {
    let ctx = context();
    let tables = list_tables(&ctx);
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].table_number, 5);
    assert_eq!(ctx.feed.subscriber_count(), 0);
}
