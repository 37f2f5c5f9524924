//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and complex operations.

pub mod auth_service;
pub mod blacklist_service;
pub mod booking_service;
pub mod notification_service;
pub mod onboarding_service;
pub mod report_service;
pub mod rider_context_service;
pub mod shop_service;
pub mod storage_service;
pub mod webhook_service;
