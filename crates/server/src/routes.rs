use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use shared::{
    domain::{Order, OrderId, Table},
    error::{ApiError, ErrorCode, FieldError},
    protocol::{parse_payload, CreateOrderRequest, StatusChangeBody},
};
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::{app_state::AppState, openapi};

pub(crate) fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/orders", get(list_orders).post(create_order))
        .route(
            "/orders/:id",
            get(get_order)
                .put(change_status)
                .patch(change_status)
                .delete(delete_order),
        )
        .route("/tables", get(list_tables))
        .route("/api-docs/openapi.json", get(openapi::get_openapi_json))
}

/// HTTP rendering of an [`ApiError`]: `{error, details?}` with a status
/// code derived from the error kind.
#[derive(Debug)]
pub(crate) struct HttpError(pub(crate) ApiError);

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<FieldError>,
}

impl From<ApiError> for HttpError {
    fn from(value: ApiError) -> Self {
        Self(value)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match self.0.code {
            ErrorCode::Validation => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(message = %self.0.message, "request failed");
        }
        let body = ErrorBody {
            error: self.0.message,
            details: self.0.details,
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Server is up", body = HealthResponse))
)]
pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Every order, oldest first.
#[utoipa::path(
    get,
    path = "/orders",
    tag = "Orders",
    responses((status = 200, description = "All current orders", body = [Order]))
)]
pub(crate) async fn list_orders(State(state): State<Arc<AppState>>) -> Json<Vec<Order>> {
    Json(server_api::list_orders(&state.api).await)
}

#[utoipa::path(
    get,
    path = "/orders/{id}",
    tag = "Orders",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "The order", body = Order),
        (status = 400, description = "Id is not a positive integer", body = ErrorBody),
        (status = 404, description = "No such order", body = ErrorBody),
    )
)]
pub(crate) async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Order>, HttpError> {
    let order_id = parse_order_id(&raw_id)?;
    let order = server_api::get_order(&state.api, order_id).await?;
    Ok(Json(order))
}

#[utoipa::path(
    post,
    path = "/orders",
    tag = "Orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created and broadcast", body = Order),
        (status = 400, description = "Payload failed validation", body = ErrorBody),
    )
)]
pub(crate) async fn create_order(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), HttpError> {
    let request: CreateOrderRequest = parse_payload(json_body(payload)?).map_err(rejected)?;
    let order = server_api::create_order(&state.api, request.into()).await;
    Ok((StatusCode::CREATED, Json(order)))
}

#[utoipa::path(
    put,
    path = "/orders/{id}",
    tag = "Orders",
    params(("id" = i64, Path, description = "Order id")),
    request_body = StatusChangeBody,
    responses(
        (status = 200, description = "Updated order (PATCH is accepted too)", body = Order),
        (status = 400, description = "Bad id or status", body = ErrorBody),
        (status = 404, description = "No such order", body = ErrorBody),
    )
)]
pub(crate) async fn change_status(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Order>, HttpError> {
    let order_id = parse_order_id(&raw_id)?;
    let body: StatusChangeBody = parse_payload(json_body(payload)?).map_err(rejected)?;
    let update = server_api::change_status(&state.api, order_id, body.status()?).await?;
    Ok(Json(update.order))
}

#[utoipa::path(
    delete,
    path = "/orders/{id}",
    tag = "Orders",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 204, description = "Order removed"),
        (status = 400, description = "Id is not a positive integer", body = ErrorBody),
        (status = 404, description = "No such order", body = ErrorBody),
    )
)]
pub(crate) async fn delete_order(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, HttpError> {
    let order_id = parse_order_id(&raw_id)?;
    server_api::delete_order(&state.api, order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/tables",
    tag = "Tables",
    responses((status = 200, description = "Table directory", body = [Table]))
)]
pub(crate) async fn list_tables(State(state): State<Arc<AppState>>) -> Json<Vec<Table>> {
    Json(server_api::list_tables(&state.api))
}

fn parse_order_id(raw: &str) -> Result<OrderId, HttpError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(OrderId(id)),
        _ => Err(HttpError(ApiError::validation(vec![FieldError::new(
            "id",
            "order id must be a positive integer",
        )]))),
    }
}

fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, HttpError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        rejected(ApiError::validation(vec![FieldError::new(
            "body",
            rejection.body_text(),
        )]))
    })
}

fn rejected(err: ApiError) -> HttpError {
    warn!(details = ?err.details, "rejected request payload");
    HttpError(err)
}
