use std::sync::OnceLock;

use axum::{
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use shared::{
    domain::{OccupancyState, Order, OrderStatus, Table},
    error::{ApiError, FieldError},
    protocol::{CreateOrderRequest, StatusChangeBody},
};
use utoipa::OpenApi;

use crate::routes::{ErrorBody, HealthResponse, HttpError};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Restaurant orders API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Order intake and kitchen status for waiters and the kitchen. \
            Live updates are served separately as WebSocket events on /ws."
    ),
    paths(
        get_openapi_json,
        crate::routes::health,
        crate::routes::list_orders,
        crate::routes::create_order,
        crate::routes::get_order,
        crate::routes::change_status,
        crate::routes::delete_order,
        crate::routes::list_tables,
    ),
    components(schemas(
        Order,
        OrderStatus,
        Table,
        OccupancyState,
        CreateOrderRequest,
        StatusChangeBody,
        ErrorBody,
        FieldError,
        HealthResponse,
    )),
    tags(
        (name = "Orders", description = "Order lifecycle"),
        (name = "Tables", description = "Read-only table directory"),
        (name = "Health", description = "Liveness"),
        (name = "OpenAPI", description = "This document"),
    )
)]
pub(crate) struct ApiDoc;

static OPENAPI_JSON: OnceLock<String> = OnceLock::new();

fn openapi_json() -> Result<String, serde_json::Error> {
    if let Some(doc) = OPENAPI_JSON.get() {
        return Ok(doc.clone());
    }
    let doc = serde_json::to_string_pretty(&ApiDoc::openapi())?;
    let _ = OPENAPI_JSON.set(doc.clone());
    Ok(doc)
}

#[utoipa::path(
    get,
    path = "/api-docs/openapi.json",
    tag = "OpenAPI",
    responses(
        (status = 200, description = "OpenAPI document", body = String, content_type = "application/json"),
        (status = 500, description = "Document could not be rendered", body = ErrorBody),
    )
)]
pub(crate) async fn get_openapi_json() -> Response {
    match openapi_json() {
        Ok(doc) => ([(CONTENT_TYPE, "application/json")], doc).into_response(),
        Err(err) => HttpError(ApiError::internal(format!(
            "failed to render API document: {err}"
        )))
        .into_response(),
    }
}
