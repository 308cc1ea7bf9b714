use super::*;
use crate::error::ErrorCode;
use chrono::Utc;
use serde_json::json;

fn sample_order() -> Order {
    Order {
        id: OrderId(1),
        table: "5".into(),
        customer_name: "Customer".into(),
        items: vec!["Burger".into()],
        status: OrderStatus::InPreparation,
        waiter_name: "Waiter".into(),
        created_at: Utc::now(),
    }
}

#[test]
fn create_payload_accepts_minimal_shape() {
    let request: CreateOrderRequest =
        parse_payload(json!({ "table": "5", "items": ["Burger"] })).expect("valid");
    assert_eq!(request.table, "5");
    assert_eq!(request.waiter_name, None);

    let with_waiter: CreateOrderRequest = parse_payload(
        json!({ "table": "2", "items": ["Soup", "Bread"], "waiterName": "Ana" }),
    )
    .expect("valid");
    assert_eq!(with_waiter.waiter_name.as_deref(), Some("Ana"));
}

#[test]
fn create_payload_rejects_empty_items() {
    let err = parse_payload::<CreateOrderRequest>(json!({ "table": "5", "items": [] }))
        .expect_err("empty items");
    assert_eq!(err.code, ErrorCode::Validation);
    assert!(err.details.iter().any(|d| d.field == "items"));
}

#[test]
fn create_payload_rejects_blank_item_and_table() {
    let err = parse_payload::<CreateOrderRequest>(json!({ "table": "", "items": ["Soup", ""] }))
        .expect_err("blank fields");
    let fields: Vec<&str> = err.details.iter().map(|d| d.field.as_str()).collect();
    assert!(fields.contains(&"table"));
    assert!(fields.contains(&"items"));
    let items = err
        .details
        .iter()
        .find(|d| d.field == "items")
        .expect("items detail");
    assert!(items.message.contains('1'));
}

#[test]
fn missing_field_is_reported_by_name() {
    let err = parse_payload::<CreateOrderRequest>(json!({ "items": ["Soup"] }))
        .expect_err("missing table");
    assert_eq!(err.details.len(), 1);
    assert_eq!(err.details[0].field, "table");
}

#[test]
fn wrong_json_type_is_reported_on_the_offending_field() {
    let err = parse_payload::<CreateOrderRequest>(json!({ "table": 5, "items": ["Soup"] }))
        .expect_err("numeric table");
    assert_eq!(err.code, ErrorCode::Validation);
    assert_eq!(err.details.len(), 1);
    assert_eq!(err.details[0].field, "table");

    let err = parse_payload::<CreateOrderRequest>(json!({ "table": "5", "items": ["Soup", 7] }))
        .expect_err("numeric item");
    assert_eq!(err.details[0].field, "items");

    let err =
        parse_payload::<ChangeStatusRequest>(json!({ "orderId": "1", "newStatus": "Pending" }))
            .expect_err("string id");
    assert_eq!(err.details[0].field, "orderId");

    let err = parse_payload::<CreateOrderRequest>(serde_json::Value::Null).expect_err("null");
    assert_eq!(err.details[0].field, "payload");
}

#[test]
fn waiter_name_may_be_omitted_but_not_null() {
    let request: CreateOrderRequest =
        parse_payload(json!({ "table": "5", "items": ["Soup"] })).expect("omitted");
    assert_eq!(request.waiter_name, None);

    let err = parse_payload::<CreateOrderRequest>(
        json!({ "table": "5", "items": ["Soup"], "waiterName": null }),
    )
    .expect_err("null waiter");
    assert_eq!(err.details[0].field, "waiterName");
}

#[test]
fn change_status_payload_checks_id_and_status() {
    let ok: ChangeStatusRequest =
        parse_payload(json!({ "orderId": 3, "newStatus": "ReadyToServe" })).expect("valid");
    assert_eq!(
        ok.into_parts().expect("parts"),
        (OrderId(3), OrderStatus::ReadyToServe)
    );

    let err = parse_payload::<ChangeStatusRequest>(json!({ "orderId": 0, "newStatus": "Pending" }))
        .expect_err("zero id");
    assert_eq!(err.details[0].field, "orderId");

    let err =
        parse_payload::<ChangeStatusRequest>(json!({ "orderId": 1, "newStatus": "Cooking" }))
            .expect_err("bad status");
    assert_eq!(err.details[0].field, "newStatus");

    let err =
        parse_payload::<ChangeStatusRequest>(json!({ "orderId": 1.5, "newStatus": "Pending" }))
            .expect_err("fractional id");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[test]
fn server_events_use_event_data_envelope() {
    let created = serde_json::to_value(ServerEvent::OrderCreated(sample_order())).expect("json");
    assert_eq!(created["event"], "order-created");
    assert_eq!(created["data"]["id"], 1);

    let initial = serde_json::to_value(ServerEvent::InitialOrders(Vec::new())).expect("json");
    assert_eq!(initial, json!({ "event": "initial-orders", "data": [] }));

    let order = sample_order();
    let updated = serde_json::to_value(ServerEvent::StatusUpdated(StatusUpdate {
        order_id: order.id,
        new_status: order.status,
        order,
    }))
    .expect("json");
    assert_eq!(updated["event"], "status-updated");
    assert_eq!(updated["data"]["orderId"], 1);
    assert_eq!(updated["data"]["newStatus"], "InPreparation");
    assert_eq!(updated["data"]["order"]["status"], "InPreparation");
}

#[test]
fn error_event_omits_empty_details() {
    let not_found = ErrorEvent::from_api_error(EVENT_CHANGE_STATUS, ApiError::not_found());
    let value = serde_json::to_value(ServerEvent::Error(not_found)).expect("json");
    assert_eq!(
        value,
        json!({ "event": "error", "data": { "event": "change-status", "message": "not found" } })
    );

    let invalid = ErrorEvent::from_api_error(
        EVENT_CREATE_ORDER,
        ApiError::validation(vec![FieldError::new("items", "at least one item is required")]),
    );
    assert_eq!(invalid.details.as_ref().map(Vec::len), Some(1));
}

#[test]
fn client_events_match_the_inbound_frame_shape() {
    let event = ClientEvent::ChangeStatus(ChangeStatusRequest::new(
        OrderId(4),
        OrderStatus::InPreparation,
    ));
    let text = serde_json::to_string(&event).expect("json");
    let frame: ClientFrame = serde_json::from_str(&text).expect("frame");
    assert_eq!(frame.event, EVENT_CHANGE_STATUS);
    assert_eq!(frame.data, json!({ "orderId": 4, "newStatus": "InPreparation" }));
}

#[test]
fn wire_field_names_are_camel_case() {
    assert_eq!(wire_field_name("order_id"), "orderId");
    assert_eq!(wire_field_name("newStatus"), "newStatus");
    assert_eq!(wire_field_name("items"), "items");
}
