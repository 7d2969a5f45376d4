//! Signing endpoint.

use actix_web::{HttpResponse, ResponseError, web};
use serde::{Deserialize, Serialize};

use crate::error::SignerError;
use crate::slashing::{ArbitrationService, SignIntent, Signature};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SignResponse {
    pub signature: Signature,
}

/// POST /sign
///
/// Decide and sign one intent. The engine blocks on storage, so it runs on
/// the blocking pool.
#[tracing::instrument(
    skip(service, intent),
    fields(public_key = %intent.public_key, kind = intent.message.kind())
)]
pub async fn sign(
    service: web::Data<ArbitrationService>,
    intent: web::Json<SignIntent>,
) -> HttpResponse {
    let intent = intent.into_inner();
    let result = web::block(move || service.decide_and_sign(&intent))
        .await
        .map_err(|e| SignerError::Internal(format!("signing task failed: {e}")))
        .and_then(|result| result);

    match result {
        Ok(signature) => HttpResponse::Ok().json(SignResponse { signature }),
        Err(e) => {
            if e.refusal().is_none() && !matches!(e, SignerError::Locked | SignerError::AccountNotFound) {
                tracing::error!(error = %e, "Signing request failed");
            }
            e.error_response()
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/sign", web::post().to(sign));
}
