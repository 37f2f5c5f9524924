//! Shop webhook endpoints and the booking event payload they receive.
//!
//! A manager registers an endpoint URL and gets back a secret once. Every
//! booking creation and status change is then POSTed to the shop's active
//! endpoints, signed with HMAC-SHA256 over the raw JSON body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::booking::{Booking, BookingStatus};

/// Row of `webhook_endpoints`.
///
/// The secret is kept in plaintext because signing needs it; responses
/// only carry it at registration.
#[derive(Debug, Clone, FromRow)]
pub struct WebhookEndpoint {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub url: String,
    pub secret: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /api/v1/shops/{id}/webhooks`.
#[derive(Debug, Deserialize)]
pub struct WebhookEndpointRequest {
    pub url: String,
}

/// Endpoint as returned to managers; `secret` is set only on registration.
#[derive(Debug, Serialize)]
pub struct WebhookEndpointResponse {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<WebhookEndpoint> for WebhookEndpointResponse {
    fn from(endpoint: WebhookEndpoint) -> Self {
        Self {
            id: endpoint.id,
            shop_id: endpoint.shop_id,
            url: endpoint.url,
            secret: None,
            is_active: endpoint.is_active,
            created_at: endpoint.created_at,
        }
    }
}

impl WebhookEndpointResponse {
    pub fn with_secret(mut self, secret: String) -> Self {
        self.secret = Some(secret);
        self
    }
}

/// Kind of booking event delivered to webhooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingEventType {
    #[serde(rename = "booking.created")]
    Created,
    #[serde(rename = "booking.status_changed")]
    StatusChanged,
}

impl BookingEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingEventType::Created => "booking.created",
            BookingEventType::StatusChanged => "booking.status_changed",
        }
    }
}

/// JSON body delivered for a booking event.
///
/// # Example
///
/// ```json
/// {
///   "event_type": "booking.status_changed",
///   "event_id": "550e8400-e29b-41d4-a716-446655440000",
///   "created_at": "2025-01-15T10:30:00Z",
///   "data": {
///     "booking": {
///       "id": "...",
///       "scooter_id": "...",
///       "status": "active",
///       "previous_status": "confirmed",
///       "total_cents": 2400
///     }
///   }
/// }
/// ```
///
/// Delivered with `X-Webhook-Signature: sha256=<hex>`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event_type: BookingEventType,
    pub event_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub data: WebhookData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookData {
    pub booking: BookingWebhookData,
}

/// Booking fields included in webhook payloads.
#[derive(Debug, Serialize, Deserialize)]
pub struct BookingWebhookData {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub scooter_id: Uuid,
    pub rider_id: Uuid,
    pub status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<BookingStatus>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub total_cents: i64,
}

impl WebhookPayload {
    pub fn new(
        event_id: Uuid,
        event_type: BookingEventType,
        booking: &Booking,
        previous_status: Option<BookingStatus>,
    ) -> Self {
        Self {
            event_type,
            event_id,
            created_at: Utc::now(),
            data: WebhookData {
                booking: BookingWebhookData {
                    id: booking.id,
                    shop_id: booking.shop_id,
                    scooter_id: booking.scooter_id,
                    rider_id: booking.rider_id,
                    status: booking.status,
                    previous_status,
                    start_at: booking.start_at,
                    end_at: booking.end_at,
                    total_cents: booking.total_cents,
                },
            },
        }
    }
}
