//! Notification inbox handlers.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::notification::{MarkAllReadResponse, Notification, NotificationListQuery},
    services::notification_service,
};

/// `GET /api/v1/notifications?unread=true`
///
/// Newest first, at most 100.
pub async fn list_notifications(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications =
        notification_service::list_notifications(&pool, auth.user_id, query.unread).await?;
    Ok(Json(notifications))
}

pub async fn mark_read(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Notification>, AppError> {
    let notification = notification_service::mark_read(&pool, auth.user_id, notification_id).await?;
    Ok(Json(notification))
}

pub async fn mark_all_read(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<MarkAllReadResponse>, AppError> {
    let updated = notification_service::mark_all_read(&pool, auth.user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}
