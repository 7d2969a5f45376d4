//! Health check, version and build info endpoints.
//!
//! These endpoints are public (no authentication required).

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use crate::config::Settings;

const SERVICE_NAME: &str = "slashing-signer";

/// Health check response.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub network: String,
}

/// Build information response.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfoResponse {
    pub service: String,
    pub version: String,
    pub network: String,
    pub git_sha: String,
    pub build_time: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct VersionResponse {
    pub version: String,
}

/// GET /health
#[tracing::instrument(skip(settings))]
pub async fn health(settings: web::Data<Settings>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        network: settings.network().to_string(),
    })
}

/// GET /version
#[tracing::instrument]
pub async fn version() -> HttpResponse {
    HttpResponse::Ok().json(VersionResponse {
        version: format!("{SERVICE_NAME}/v{}", env!("CARGO_PKG_VERSION")),
    })
}

/// GET /build-info
///
/// Returns build metadata for deployment verification.
#[tracing::instrument(skip(settings))]
pub async fn build_info(settings: web::Data<Settings>) -> HttpResponse {
    HttpResponse::Ok().json(BuildInfoResponse {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        network: settings.network().to_string(),
        git_sha: env!("GIT_SHA").to_string(),
        build_time: env!("BUILD_TIME").to_string(),
    })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/version", web::get().to(version))
        .route("/build-info", web::get().to(build_info));
}
