//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Checks the caller's access and runs the matching service
//! 3. Returns HTTP response (JSON, status code)

pub mod admin;
pub mod auth;
pub mod blacklist;
pub mod bookings;
pub mod branches;
pub mod health;
pub mod insurance;
pub mod notifications;
pub mod onboarding;
pub mod reports;
pub mod rider_context;
pub mod scooters;
pub mod shops;
pub mod staff;
pub mod uploads;
pub mod webhooks;
