//! HTTP handlers for shop webhook endpoint management.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::webhook::{WebhookEndpointRequest, WebhookEndpointResponse},
    services::webhook_service,
};

/// Register a webhook endpoint for a shop.
///
/// # Endpoint
///
/// `POST /api/v1/shops/{id}/webhooks` (manager)
///
/// # Request Body
///
/// ```json
/// { "url": "https://shop.example/hooks/bookings" }
/// ```
///
/// # Response
///
/// - **201 Created**: the endpoint including its signing `secret`, which is not shown again
/// - **400**: `invalid_webhook_url` (not HTTPS outside localhost, malformed, too long)
/// - **403**: caller is not a manager of the shop
pub async fn create_webhook(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
    Json(request): Json<WebhookEndpointRequest>,
) -> Result<impl IntoResponse, AppError> {
    let endpoint =
        webhook_service::create_webhook_endpoint(&pool, &auth, shop_id, request).await?;

    Ok((StatusCode::CREATED, Json(endpoint)))
}

/// List the shop's active endpoints. Secrets are not included.
pub async fn list_webhooks(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<Vec<WebhookEndpointResponse>>, AppError> {
    let endpoints = webhook_service::list_webhook_endpoints(&pool, &auth, shop_id).await?;
    Ok(Json(endpoints))
}

/// Deactivate an endpoint. Returns 204 No Content.
pub async fn delete_webhook(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((shop_id, endpoint_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    webhook_service::delete_webhook_endpoint(&pool, &auth, shop_id, endpoint_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
