//! Rider context handlers.
//!
//! The context tells the rider app which screen the rider is on. Rental
//! phases follow booking transitions on the server; the client only sends
//! browsing events.

use axum::{Extension, Json, extract::State};

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::rider_context::{RiderContext, RiderEventRequest},
    services::rider_context_service,
};

/// `GET /api/v1/rider/context`
///
/// Reconciled with the rider's bookings before it is returned.
pub async fn get_context(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<RiderContext>, AppError> {
    let context = rider_context_service::get_context(&pool, auth.user_id).await?;
    Ok(Json(context))
}

/// `POST /api/v1/rider/context/events`
///
/// ```json
/// { "event": "dismiss" }
/// ```
///
/// Accepts `start_looking`, `stop_looking` and `dismiss`. Events not valid
/// in the current phase return **422** `invalid_transition`.
pub async fn send_event(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<RiderEventRequest>,
) -> Result<Json<RiderContext>, AppError> {
    let context =
        rider_context_service::apply_client_event(&pool, auth.user_id, request.event.into())
            .await?;
    Ok(Json(context))
}
