//! HTTP router assembly.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{handlers, middleware, state::AppState};

/// Multipart framing allowance on top of the file size limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the application router.
///
/// Public routes need no session; everything in the authenticated group
/// goes through `auth_middleware` first. Paths shared by both groups (for
/// example `GET` and `PATCH /api/v1/shops/{id}`) are merged per method.
pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/auth/sign-up", post(handlers::auth::sign_up))
        .route("/api/v1/auth/sign-in", post(handlers::auth::sign_in))
        .route("/api/v1/shops", get(handlers::shops::list_shops))
        .route("/api/v1/shops/{id}", get(handlers::shops::get_shop))
        .route(
            "/api/v1/shops/{id}/branches",
            get(handlers::branches::list_branches),
        )
        .route(
            "/api/v1/shops/{id}/insurance-policies",
            get(handlers::insurance::list_policies),
        )
        .route("/api/v1/scooters", get(handlers::scooters::search_scooters))
        .route("/api/v1/scooters/{id}", get(handlers::scooters::get_scooter));

    let authenticated_routes = Router::new()
        // Session and profile
        .route("/api/v1/auth/sign-out", post(handlers::auth::sign_out))
        .route(
            "/api/v1/auth/me",
            get(handlers::auth::me).patch(handlers::auth::update_profile),
        )
        // Shops, branches, staff
        .route("/api/v1/shops", post(handlers::shops::create_shop))
        .route("/api/v1/shops/{id}", patch(handlers::shops::update_shop))
        .route("/api/v1/me/shops", get(handlers::shops::my_shops))
        .route(
            "/api/v1/shops/{id}/branches",
            post(handlers::branches::create_branch),
        )
        .route(
            "/api/v1/shops/{id}/branches/{branch_id}",
            delete(handlers::branches::delete_branch),
        )
        .route(
            "/api/v1/shops/{id}/staff",
            get(handlers::staff::list_staff).post(handlers::staff::add_staff),
        )
        .route(
            "/api/v1/shops/{id}/staff/{user_id}",
            delete(handlers::staff::remove_staff),
        )
        // Fleet and insurance
        .route(
            "/api/v1/shops/{id}/scooters",
            get(handlers::scooters::list_shop_scooters).post(handlers::scooters::create_scooter),
        )
        .route(
            "/api/v1/scooters/{id}",
            patch(handlers::scooters::update_scooter).delete(handlers::scooters::retire_scooter),
        )
        .route(
            "/api/v1/shops/{id}/insurance-policies",
            post(handlers::insurance::create_policy),
        )
        .route(
            "/api/v1/shops/{id}/insurance-policies/{policy_id}",
            patch(handlers::insurance::update_policy),
        )
        // Bookings
        .route(
            "/api/v1/bookings",
            get(handlers::bookings::list_my_bookings).post(handlers::bookings::create_booking),
        )
        .route(
            "/api/v1/bookings/{id}",
            get(handlers::bookings::get_booking),
        )
        .route(
            "/api/v1/bookings/{id}/status",
            post(handlers::bookings::update_booking_status),
        )
        .route(
            "/api/v1/shops/{id}/bookings",
            get(handlers::bookings::list_shop_bookings),
        )
        // Onboarding
        .route(
            "/api/v1/shops/{id}/onboarding-sessions",
            get(handlers::onboarding::list_sessions).post(handlers::onboarding::create_session),
        )
        .route(
            "/api/v1/onboarding/activate",
            post(handlers::onboarding::activate),
        )
        .route(
            "/api/v1/onboarding-sessions/{id}",
            get(handlers::onboarding::get_session),
        )
        .route(
            "/api/v1/onboarding-sessions/{id}/steps",
            post(handlers::onboarding::advance),
        )
        .route(
            "/api/v1/onboarding-sessions/{id}/cancel",
            post(handlers::onboarding::cancel),
        )
        // Blacklist
        .route(
            "/api/v1/admin/blacklist",
            get(handlers::blacklist::list_global_entries)
                .post(handlers::blacklist::create_global_entry),
        )
        .route(
            "/api/v1/shops/{id}/blacklist",
            get(handlers::blacklist::list_shop_entries)
                .post(handlers::blacklist::create_shop_entry),
        )
        .route(
            "/api/v1/shops/{id}/blacklist/check",
            get(handlers::blacklist::check_rider),
        )
        .route(
            "/api/v1/blacklist/{id}",
            delete(handlers::blacklist::delete_entry),
        )
        // Notifications
        .route(
            "/api/v1/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/api/v1/notifications/read-all",
            post(handlers::notifications::mark_all_read),
        )
        .route(
            "/api/v1/notifications/{id}/read",
            post(handlers::notifications::mark_read),
        )
        // Reports
        .route(
            "/api/v1/shops/{id}/reports/bookings",
            get(handlers::reports::booking_stats),
        )
        .route(
            "/api/v1/shops/{id}/reports/revenue",
            get(handlers::reports::revenue_stats),
        )
        .route(
            "/api/v1/shops/{id}/reports/utilization",
            get(handlers::reports::scooter_utilization),
        )
        .route(
            "/api/v1/shops/{id}/reports/top-scooters",
            get(handlers::reports::top_scooters),
        )
        // Rider context
        .route(
            "/api/v1/rider/context",
            get(handlers::rider_context::get_context),
        )
        .route(
            "/api/v1/rider/context/events",
            post(handlers::rider_context::send_event),
        )
        // Uploads
        .route(
            "/api/v1/uploads",
            post(handlers::uploads::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Shop webhooks
        .route(
            "/api/v1/shops/{id}/webhooks",
            get(handlers::webhooks::list_webhooks).post(handlers::webhooks::create_webhook),
        )
        .route(
            "/api/v1/shops/{id}/webhooks/{endpoint_id}",
            delete(handlers::webhooks::delete_webhook),
        )
        // Administration
        .route("/api/v1/admin/users", get(handlers::admin::list_users))
        .route(
            "/api/v1/admin/users/{id}",
            patch(handlers::admin::update_user),
        )
        .route(
            "/api/v1/admin/users/{id}/revoke-sessions",
            post(handlers::admin::revoke_sessions),
        )
        .route("/api/v1/admin/shops", get(handlers::admin::list_shops))
        .route(
            "/api/v1/admin/shops/{id}/moderate",
            post(handlers::admin::moderate_shop),
        )
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.pool.clone(),
            middleware::auth::auth_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    /// Router over a pool that never connects; only requests rejected
    /// before the database is touched can be exercised.
    fn test_app() -> Router {
        let config = Config::for_tests();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        build_router(AppState::new(pool, config))
    }

    async fn error_code(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        body["error"]["code"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn protected_route_without_token_is_unauthorized() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/auth/me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(response).await, "unauthorized");
    }

    #[tokio::test]
    async fn non_bearer_authorization_is_unauthorized() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/bookings")
                    .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authenticated_method_on_public_path_still_needs_a_session() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/api/v1/shops/{}", uuid::Uuid::new_v4()))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"x"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sign_up_validates_before_touching_the_database() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/auth/sign-up")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"email":"rider@example.com","password":"short","full_name":"Ada"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "invalid_request");
    }

    #[tokio::test]
    async fn malformed_search_query_is_rejected() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/scooters?limit=many")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/nothing-here")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
