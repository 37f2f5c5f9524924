//! Shop webhook endpoints and booking event delivery.
//!
//! Delivery runs in a background task after the booking transaction commits,
//! so a slow or failing endpoint never affects the booking itself.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        booking::{Booking, BookingStatus},
        shop::ShopAccess,
        webhook::{
            BookingEventType, WebhookEndpoint, WebhookEndpointRequest, WebhookEndpointResponse,
            WebhookPayload,
        },
    },
    services::shop_service,
};

type HmacSha256 = Hmac<Sha256>;

const DELIVERY_TIMEOUT_SECS: u64 = 5;

/// Register a webhook endpoint for a shop (manager or owner).
///
/// # Process
///
/// 1. Validate URL format
/// 2. Generate a 32-byte secret
/// 3. Store the endpoint
/// 4. Return it with the secret, which is never shown again
pub async fn create_webhook_endpoint(
    pool: &DbPool,
    auth: &AuthContext,
    shop_id: Uuid,
    request: WebhookEndpointRequest,
) -> Result<WebhookEndpointResponse, AppError> {
    shop_service::require_shop_access(pool, auth, shop_id, ShopAccess::Manager).await?;
    validate_webhook_url(&request.url)?;

    let secret = generate_secret();

    let endpoint = sqlx::query_as::<_, WebhookEndpoint>(
        r#"
        INSERT INTO webhook_endpoints (shop_id, url, secret)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(shop_id)
    .bind(&request.url)
    .bind(&secret)
    .fetch_one(pool)
    .await?;

    tracing::info!(endpoint_id = %endpoint.id, shop_id = %shop_id, "Webhook endpoint registered");

    Ok(WebhookEndpointResponse::from(endpoint).with_secret(secret))
}

/// List a shop's active endpoints, without secrets.
pub async fn list_webhook_endpoints(
    pool: &DbPool,
    auth: &AuthContext,
    shop_id: Uuid,
) -> Result<Vec<WebhookEndpointResponse>, AppError> {
    shop_service::require_shop_access(pool, auth, shop_id, ShopAccess::Manager).await?;

    let endpoints = sqlx::query_as::<_, WebhookEndpoint>(
        "SELECT * FROM webhook_endpoints WHERE shop_id = $1 AND is_active = true ORDER BY created_at DESC",
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await?;

    Ok(endpoints.into_iter().map(Into::into).collect())
}

/// Deactivate an endpoint. Delivery history is kept.
pub async fn delete_webhook_endpoint(
    pool: &DbPool,
    auth: &AuthContext,
    shop_id: Uuid,
    endpoint_id: Uuid,
) -> Result<(), AppError> {
    shop_service::require_shop_access(pool, auth, shop_id, ShopAccess::Manager).await?;

    let result = sqlx::query(
        "UPDATE webhook_endpoints SET is_active = false WHERE id = $1 AND shop_id = $2 AND is_active = true",
    )
    .bind(endpoint_id)
    .bind(shop_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("webhook endpoint"));
    }

    Ok(())
}

/// Deliver a booking event to the shop's endpoints in the background.
pub fn dispatch_booking_event(
    pool: DbPool,
    booking: Booking,
    event_type: BookingEventType,
    previous_status: Option<BookingStatus>,
) {
    tokio::spawn(async move {
        if let Err(e) = notify_booking_webhooks(&pool, &booking, event_type, previous_status).await
        {
            tracing::error!(booking_id = %booking.id, "Webhook dispatch failed: {}", e);
        }
    });
}

/// Send a booking event to every active endpoint of the booking's shop.
///
/// Individual endpoint failures are logged and do not stop the others.
async fn notify_booking_webhooks(
    pool: &DbPool,
    booking: &Booking,
    event_type: BookingEventType,
    previous_status: Option<BookingStatus>,
) -> Result<(), AppError> {
    let endpoints = sqlx::query_as::<_, WebhookEndpoint>(
        "SELECT * FROM webhook_endpoints WHERE shop_id = $1 AND is_active = true",
    )
    .bind(booking.shop_id)
    .fetch_all(pool)
    .await?;

    if endpoints.is_empty() {
        return Ok(());
    }

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(DELIVERY_TIMEOUT_SECS))
        .build()
        .map_err(|e| AppError::Internal(format!("HTTP client error: {}", e)))?;

    for endpoint in endpoints {
        let payload = WebhookPayload::new(Uuid::new_v4(), event_type, booking, previous_status);
        if let Err(e) = send_webhook(pool, &client, &endpoint, booking.id, &payload).await {
            tracing::error!("Failed to send webhook to {}: {:?}", endpoint.url, e);
        }
    }

    Ok(())
}

/// Send one signed payload and record the attempt in `webhook_events`.
///
/// # Headers Sent
///
/// - `Content-Type: application/json`
/// - `X-Webhook-Signature: sha256=<hex>`
/// - `X-Webhook-Event-Id: <uuid>`
/// - `X-Webhook-Event-Type: booking.created | booking.status_changed`
async fn send_webhook(
    pool: &DbPool,
    client: &reqwest::Client,
    endpoint: &WebhookEndpoint,
    booking_id: Uuid,
    payload: &WebhookPayload,
) -> Result<(), AppError> {
    let payload_json = serde_json::to_string(payload)
        .map_err(|e| AppError::Internal(format!("Failed to serialize payload: {}", e)))?;

    let signature = generate_signature(&endpoint.secret, &payload_json)?;

    let response = client
        .post(&endpoint.url)
        .header("Content-Type", "application/json")
        .header("X-Webhook-Signature", &signature)
        .header("X-Webhook-Event-Id", payload.event_id.to_string())
        .header("X-Webhook-Event-Type", payload.event_type.as_str())
        .body(payload_json.clone())
        .send()
        .await;

    let (status, body) = match response {
        Ok(resp) => {
            let status = i32::from(resp.status().as_u16());
            let body = resp.text().await.ok();
            (Some(status), body)
        }
        Err(e) => {
            let error_msg = format!("Request failed: {}", e);
            tracing::warn!(endpoint_id = %endpoint.id, "{}", error_msg);
            (None, Some(error_msg))
        }
    };

    let payload_value = serde_json::to_value(payload)
        .map_err(|e| AppError::Internal(format!("Failed to encode payload: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO webhook_events (
            id,
            webhook_endpoint_id,
            booking_id,
            event_type,
            payload,
            response_status,
            response_body
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(payload.event_id)
    .bind(endpoint.id)
    .bind(booking_id)
    .bind(payload.event_type.as_str())
    .bind(payload_value)
    .bind(status)
    .bind(body)
    .execute(pool)
    .await?;

    Ok(())
}

/// HMAC-SHA256 signature of a payload, formatted `sha256=<hex>`.
///
/// Receivers recompute HMAC-SHA256(secret, request_body) and compare in
/// constant time.
pub fn generate_signature(secret: &str, payload: &str) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid HMAC key: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// 64 hex characters (32 random bytes).
fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Validate webhook URL format.
///
/// # Rules
///
/// - Must be a valid URL, at most 2048 characters
/// - Must be HTTPS, except plain HTTP to localhost
pub fn validate_webhook_url(url: &str) -> Result<(), AppError> {
    if url.len() > 2048 {
        return Err(AppError::InvalidWebhookUrl(
            "URL exceeds 2048 characters".to_string(),
        ));
    }

    let parsed = url::Url::parse(url)
        .map_err(|_| AppError::InvalidWebhookUrl("Invalid URL format".to_string()))?;

    match parsed.scheme() {
        "https" => Ok(()),
        "http" if matches!(parsed.host_str(), Some("localhost" | "127.0.0.1")) => Ok(()),
        "http" => Err(AppError::InvalidWebhookUrl(
            "HTTP is only allowed for localhost. Use HTTPS for production.".to_string(),
        )),
        _ => Err(AppError::InvalidWebhookUrl(
            "URL must use HTTP or HTTPS".to_string(),
        )),
    }
}
