//! Slashing-protected remote signer.
//!
//! Holds validator BLS keys and signs consensus messages only after checking
//! them against persisted slashing protection history.
//!
//! ## Startup
//!
//! 1. Load and validate settings
//! 2. Open the ReDB database and bind it to the configured network
//! 3. Load validator keys
//! 4. Serve HTTP

use std::sync::Arc;

use actix_web::{App, HttpServer, middleware, web};
use slashing_signer::{
    audit::{AuditActor, AuditEventType, AuditLogger, AuditOutcome},
    chain::NetworkClock,
    config::Settings,
    crypto::BlsSigner,
    keystore::KeyStore,
    middleware::InternalAuth,
    routes,
    slashing::ArbitrationService,
    storage::Storage,
    telemetry,
};
use tracing_actix_web::TracingLogger;

fn exit_with(message: &str, error: &dyn std::fmt::Display) -> ! {
    tracing::error!(error = %error, "{message}");
    telemetry::shutdown_tracing();
    std::process::exit(1);
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    let settings = Settings::from_env();
    if let Err(message) = settings.validate() {
        tracing::error!("{message}");
        std::process::exit(1);
    }

    let storage = Storage::open(settings.db_path())
        .unwrap_or_else(|e| exit_with("Failed to open storage database", &e));

    if let Err(e) = storage.bind_network(settings.network()) {
        exit_with("Refusing to start with mismatched network", &e);
    }

    let keystore = KeyStore::load(settings.keys_path())
        .unwrap_or_else(|e| exit_with("Failed to load validator keys", &e));
    if keystore.is_empty() {
        tracing::warn!("No validator keys loaded; every signing request will be refused");
    }

    let audit = match settings.audit_key() {
        Some(seed) => AuditLogger::with_hex_key(storage.clone(), seed),
        None => {
            tracing::warn!(
                "SIGNER_AUDIT_KEY not set; audit entries are signed with a per-process key"
            );
            AuditLogger::new(storage.clone())
        }
    }
    .map(Arc::new)
    .unwrap_or_else(|e| exit_with("Failed to initialise audit log", &e));

    let addr = settings.socket_addr();
    let network = settings.network();
    let accounts = keystore.len();

    if let Err(e) = audit.append(
        AuditEventType::ServiceStart,
        AuditActor::System,
        None,
        AuditOutcome::Success,
        Some(serde_json::json!({ "network": network, "accounts": accounts })),
    ) {
        tracing::warn!(error = %e, "Failed to record service start");
    }

    let service = ArbitrationService::new(
        Arc::new(keystore),
        Arc::new(storage),
        Arc::new(BlsSigner),
        Arc::new(NetworkClock::new(network)),
        settings.policy(),
    )
    .with_audit(audit.clone());

    tracing::info!(
        addr = %addr,
        network = %network,
        accounts,
        max_future_epochs = settings.policy().max_future_epochs,
        max_future_slots = settings.policy().max_future_slots,
        audit_key = %audit.verifying_key_hex(),
        auth_required = settings.internal_token_required(),
        "Starting slashing signer"
    );

    let auth = InternalAuth::new(&settings);
    let json_limit = settings.body_limit_bytes();
    let settings_data = web::Data::new(settings);
    let service_data = web::Data::new(service);

    HttpServer::new(move || {
        App::new()
            .wrap(auth.clone())
            .wrap(TracingLogger::default())
            .wrap(middleware::DefaultHeaders::new().add(("X-Service", "slashing-signer")))
            .app_data(routes::json_config(json_limit))
            .app_data(settings_data.clone())
            .app_data(service_data.clone())
            .configure(routes::configure)
    })
    .bind(addr)?
    .run()
    .await?;

    if let Err(e) = audit.append(
        AuditEventType::ServiceStop,
        AuditActor::System,
        None,
        AuditOutcome::Success,
        None,
    ) {
        tracing::warn!(error = %e, "Failed to record service stop");
    }

    telemetry::shutdown_tracing();

    Ok(())
}
