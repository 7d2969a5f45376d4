//! Account listing and read-only configuration.

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use crate::chain::Network;
use crate::config::Settings;
use crate::slashing::{ArbitrationService, PublicKey, SlashingPolicy};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct AccountsResponse {
    pub public_keys: Vec<PublicKey>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ConfigResponse {
    pub network: Network,
    pub genesis_time: u64,
    pub policy: SlashingPolicy,
}

/// GET /accounts
#[tracing::instrument(skip(service))]
pub async fn list_accounts(service: web::Data<ArbitrationService>) -> HttpResponse {
    HttpResponse::Ok().json(AccountsResponse {
        public_keys: service.public_keys(),
    })
}

/// GET /config
#[tracing::instrument(skip(settings))]
pub async fn get_config(settings: web::Data<Settings>) -> HttpResponse {
    let network = settings.network();
    HttpResponse::Ok().json(ConfigResponse {
        network,
        genesis_time: network.genesis_time(),
        policy: settings.policy(),
    })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/accounts", web::get().to(list_accounts))
        .route("/config", web::get().to(get_config));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;

    use crate::routes::test_support::TestSigner;

    #[actix_rt::test]
    async fn test_list_accounts() {
        let signer = TestSigner::new();
        let app = test::init_service(signer.app().configure(configure)).await;

        let req = test::TestRequest::get().uri("/accounts").to_request();
        let body: AccountsResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.public_keys, vec![signer.public_key]);
    }

    #[actix_rt::test]
    async fn test_config_is_read_only_view() {
        let signer = TestSigner::new();
        let app = test::init_service(signer.app().configure(configure)).await;

        let req = test::TestRequest::get().uri("/config").to_request();
        let body: ConfigResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.network, Network::Holesky);
        assert_eq!(body.genesis_time, Network::Holesky.genesis_time());
        assert_eq!(body.policy, SlashingPolicy::default());

        let req = test::TestRequest::put().uri("/config").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_client_error());
    }
}
