//! HTTP routes for the signer service.
//!
//! - `health`: health check, version and build info (public)
//! - `signing`: `POST /sign`
//! - `accounts`: managed keys and read-only configuration
//! - `storage`: slashing history read and seed

pub mod accounts;
pub mod health;
pub mod signing;
pub mod storage;

use actix_web::{ResponseError, error::InternalError, web};

use crate::error::SignerError;

pub use health::{build_info, health, version};

/// JSON extractor config: size limit plus errors in the service's error body.
pub fn json_config(limit_bytes: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit_bytes)
        .error_handler(|err, _req| {
            let response = SignerError::Deserialization(err.to_string()).error_response();
            InternalError::from_response(err, response).into()
        })
}

/// Register every route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    health::configure(cfg);
    signing::configure(cfg);
    accounts::configure(cfg);
    storage::configure(cfg);
}
