use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_path_to_error::Segment;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    domain::{NewOrder, Order, OrderId, OrderStatus},
    error::{ApiError, FieldError},
};

pub const EVENT_CREATE_ORDER: &str = "create-order";
pub const EVENT_CHANGE_STATUS: &str = "change-status";
pub const EVENT_UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "table is required"))]
    pub table: String,
    #[validate(
        length(min = 1, message = "at least one item is required"),
        custom(function = "validate_items")
    )]
    pub items: Vec<String>,
    /// May be left out, but not sent as `null`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_string"
    )]
    pub waiter_name: Option<String>,
}

fn present_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    String::deserialize(deserializer).map(Some)
}

impl From<CreateOrderRequest> for NewOrder {
    fn from(value: CreateOrderRequest) -> Self {
        Self {
            table: value.table,
            items: value.items,
            waiter_name: value.waiter_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatusRequest {
    #[validate(range(min = 1, message = "orderId must be a positive integer"))]
    pub order_id: i64,
    #[validate(custom(function = "validate_status"))]
    pub new_status: String,
}

impl ChangeStatusRequest {
    pub fn new(order_id: OrderId, new_status: OrderStatus) -> Self {
        Self {
            order_id: order_id.0,
            new_status: new_status.to_string(),
        }
    }

    pub fn into_parts(self) -> Result<(OrderId, OrderStatus), ApiError> {
        let status = parse_status_field(&self.new_status)?;
        Ok((OrderId(self.order_id), status))
    }
}

/// Body of `PUT`/`PATCH /orders/{id}`; the id travels in the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeBody {
    #[validate(custom(function = "validate_status"))]
    pub new_status: String,
}

impl StatusChangeBody {
    pub fn status(&self) -> Result<OrderStatus, ApiError> {
        parse_status_field(&self.new_status)
    }
}

fn parse_status_field(raw: &str) -> Result<OrderStatus, ApiError> {
    raw.parse::<OrderStatus>()
        .map_err(|err| ApiError::validation(vec![FieldError::new("newStatus", err.to_string())]))
}

fn validate_items(items: &[String]) -> Result<(), ValidationError> {
    match items.iter().position(|item| item.is_empty()) {
        Some(index) => {
            let mut err = ValidationError::new("empty_item");
            err.message = Some(format!("item {index} must not be empty").into());
            Err(err)
        }
        None => Ok(()),
    }
}

fn validate_status(raw: &str) -> Result<(), ValidationError> {
    if raw.parse::<OrderStatus>().is_ok() {
        return Ok(());
    }
    let mut err = ValidationError::new("invalid_status");
    err.message = Some(
        format!(
            "newStatus must be one of {}",
            OrderStatus::ALL.map(OrderStatus::as_str).join(", ")
        )
        .into(),
    );
    Err(err)
}

/// Decodes a client payload and checks it against its schema.
///
/// Shape problems (missing fields, wrong JSON types) and rule violations
/// both come back as a validation [`ApiError`] with field-level detail.
pub fn parse_payload<T>(payload: serde_json::Value) -> Result<T, ApiError>
where
    T: DeserializeOwned + Validate,
{
    let parsed: T = serde_path_to_error::deserialize(payload)
        .map_err(|err| ApiError::validation(vec![shape_error(&err)]))?;
    parsed
        .validate()
        .map_err(|errors| ApiError::validation(field_errors(&errors)))?;
    Ok(parsed)
}

/// Names the top-level field a decode error happened under. Missing fields
/// fail at the object itself, so their name comes from the message.
fn shape_error(err: &serde_path_to_error::Error<serde_json::Error>) -> FieldError {
    let message = err.inner().to_string();
    let field = err
        .path()
        .iter()
        .find_map(|segment| match segment {
            Segment::Map { key } => Some(wire_field_name(key)),
            _ => None,
        })
        .or_else(|| {
            message
                .strip_prefix("missing field `")
                .and_then(|rest| rest.split('`').next())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "payload".to_string());
    FieldError::new(field, message)
}

fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut details: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = wire_field_name(&field);
            errs.iter()
                .map(|err| {
                    let message = err
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid ({})", err.code));
                    FieldError::new(field.clone(), message)
                })
                .collect::<Vec<_>>()
        })
        .collect();
    details.sort_by(|a, b| a.field.cmp(&b.field));
    details
}

/// `order_id` -> `orderId`; names that are already camelCase pass through.
fn wire_field_name(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for ch in field.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub order_id: OrderId,
    pub new_status: OrderStatus,
    pub order: Order,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDeleted {
    pub order_id: OrderId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub event: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ErrorEvent {
    pub fn from_api_error(event: impl Into<String>, err: ApiError) -> Self {
        Self {
            event: event.into(),
            message: err.message,
            details: (!err.details.is_empty()).then_some(err.details),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    InitialOrders(Vec<Order>),
    OrderCreated(Order),
    StatusUpdated(StatusUpdate),
    OrderDeleted(OrderDeleted),
    Error(ErrorEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    CreateOrder(CreateOrderRequest),
    ChangeStatus(ChangeStatusRequest),
}

/// Untyped inbound frame. The server reads the event name first so an
/// unknown or malformed payload can still be answered with that name.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
