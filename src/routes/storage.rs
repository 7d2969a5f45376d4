//! Operator access to slashing protection history.
//!
//! `PUT` seeds history for a managed key (for example after migrating from
//! another signer). Values may only move forward.

use actix_web::{HttpResponse, ResponseError, web};

use crate::error::{SignerError, SignerResult};
use crate::slashing::{ArbitrationService, PublicKey, SigningHistory};

fn parse_public_key(raw: &str) -> SignerResult<PublicKey> {
    raw.parse()
}

async fn run_blocking<T, F>(f: F) -> SignerResult<T>
where
    F: FnOnce() -> SignerResult<T> + Send + 'static,
    T: Send + 'static,
{
    web::block(f)
        .await
        .map_err(|e| SignerError::Internal(format!("storage task failed: {e}")))?
}

/// GET /storage/slashing/{public_key}
#[tracing::instrument(skip(service))]
pub async fn get_history(
    service: web::Data<ArbitrationService>,
    path: web::Path<String>,
) -> HttpResponse {
    let result = match parse_public_key(&path) {
        Ok(public_key) => run_blocking(move || service.history(&public_key)).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(history) => HttpResponse::Ok().json(history),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read slashing history");
            e.error_response()
        }
    }
}

/// PUT /storage/slashing/{public_key}
#[tracing::instrument(skip(service, seed))]
pub async fn put_history(
    service: web::Data<ArbitrationService>,
    path: web::Path<String>,
    seed: web::Json<SigningHistory>,
) -> HttpResponse {
    let seed = seed.into_inner();
    let result = match parse_public_key(&path) {
        Ok(public_key) => run_blocking(move || service.seed_history(&public_key, &seed)).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(history) => HttpResponse::Ok().json(history),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to seed slashing history");
            e.error_response()
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/storage/slashing/{public_key}", web::get().to(get_history))
        .route("/storage/slashing/{public_key}", web::put().to(put_history));
}
