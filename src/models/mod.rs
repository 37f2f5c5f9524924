//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the request/response bodies built around them.

/// Bookings and their status lifecycle
pub mod booking;
/// Global and shop-scoped rider bans
pub mod blacklist;
/// Shop insurance policies
pub mod insurance;
/// In-app notifications
pub mod notification;
/// Pickup onboarding sessions
pub mod onboarding;
/// Shop report types
pub mod report;
/// Rider journey state machine
pub mod rider_context;
/// Scooter fleet
pub mod scooter;
/// Shops, branches and staff
pub mod shop;
/// Uploaded files
pub mod upload;
/// Users and sign-in sessions
pub mod user;
/// Shop webhook endpoints and payloads
pub mod webhook;
