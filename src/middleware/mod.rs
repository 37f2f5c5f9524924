//! Request middleware.
//!
//! `auth` resolves the bearer session of protected routes into an
//! `AuthContext` extension.

pub mod auth;
