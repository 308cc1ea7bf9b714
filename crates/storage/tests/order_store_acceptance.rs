use shared::domain::{NewOrder, OrderId, OrderStatus, DEFAULT_CUSTOMER_NAME};
use storage::{OrderStore, TableDirectory};

#[tokio::test]
async fn order_lifecycle_against_a_fresh_store() {
    let store = OrderStore::new();
    let tables = TableDirectory::default();

    let input = NewOrder {
        table: "5".into(),
        items: vec!["Burger".into(), "Fries".into()],
        waiter_name: Some("Ana".into()),
    };
    let customer = tables.customer_name_for(&input.table);
    let order = store.create(input, customer).await;
    assert_eq!(order.id, OrderId(1));
    assert_eq!(order.customer_name, DEFAULT_CUSTOMER_NAME);
    assert_eq!(order.waiter_name, "Ana");

    for status in OrderStatus::ALL {
        let updated = store
            .update_status(order.id, status)
            .await
            .expect("order exists");
        assert_eq!(updated.status, status);
    }

    assert_eq!(store.list_all().await.len(), 1);
    assert!(store.delete(order.id).await);
    assert!(store.get(order.id).await.is_none());
    assert!(store.is_empty().await);
}
