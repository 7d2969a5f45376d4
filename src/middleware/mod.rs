//! Middleware for the signer service.

pub mod auth;

pub use auth::InternalAuth;
