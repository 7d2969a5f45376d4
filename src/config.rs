//! Service configuration derived from environment variables.
//!
//! Configuration is loaded once at startup and validated before the service starts.
//!
//! ## Environment Variables
//!
//! - `SIGNER_PORT`: HTTP port (default: 9000)
//! - `SIGNER_HOST`: Bind address (default: :: for dual-stack IPv4/IPv6)
//! - `SIGNER_DB_PATH`: Path to ReDB database file
//! - `SIGNER_KEYS_PATH`: Path to the JSON validator key file
//! - `SIGNER_NETWORK`: mainnet, prater, sepolia, holesky or hoodi (default: mainnet)
//! - `SIGNER_MAX_FUTURE_EPOCHS`: attestation horizon (default: 1000)
//! - `SIGNER_MAX_FUTURE_SLOTS`: proposal horizon (default: 32000)
//! - `SIGNER_BODY_LIMIT_MB`: JSON body limit (default: 1)
//! - `SIGNER_AUDIT_KEY`: hex Ed25519 seed for audit entries (random per start if unset)
//! - `INTERNAL_SERVICE_TOKEN`: Shared secret for caller authentication
//! - `INTERNAL_SERVICE_TOKEN_REQUIRED`: Force the token outside production
//! - `RUST_LOG`: Log level filter

use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;

use zeroize::Zeroizing;

use crate::chain::Network;
use crate::slashing::SlashingPolicy;

const DEFAULT_PORT: u16 = 9000;
const DEFAULT_BODY_LIMIT_MB: usize = 1;

/// Helper to get trimmed env var or empty string.
fn env_trim(name: &str) -> String {
    env::var(name).unwrap_or_default().trim().to_string()
}

/// Helper to get lowercase env var.
fn env_lower(name: &str) -> String {
    env_trim(name).to_lowercase()
}

/// Check if a string value is truthy.
fn is_truthy(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "yes")
}

fn env_path(name: &str, default: &str) -> PathBuf {
    let value = env_trim(name);
    if value.is_empty() {
        PathBuf::from(default)
    } else {
        PathBuf::from(value)
    }
}

fn env_optional(name: &str) -> Option<String> {
    let value = env_trim(name);
    if value.is_empty() { None } else { Some(value) }
}

/// Service configuration.
#[derive(Clone)]
pub struct Settings {
    port: u16,
    host: IpAddr,
    db_path: PathBuf,
    keys_path: PathBuf,
    network: Network,
    policy: SlashingPolicy,
    body_limit_bytes: usize,
    audit_key: Option<Zeroizing<String>>,
    internal_token: Option<String>,
    internal_token_required: bool,
    /// Values that were set but could not be parsed.
    invalid: Vec<String>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("socket_addr", &self.socket_addr())
            .field("db_path", &self.db_path)
            .field("keys_path", &self.keys_path)
            .field("network", &self.network)
            .field("policy", &self.policy)
            .field("body_limit_bytes", &self.body_limit_bytes)
            .field("internal_token_required", &self.internal_token_required)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Load settings from environment variables.
    pub fn from_env() -> Self {
        let mut invalid = Vec::new();

        let port = env_trim("SIGNER_PORT")
            .parse::<u16>()
            .unwrap_or(DEFAULT_PORT);

        // Default to IPv6 unspecified (::) for dual-stack support.
        let host = env_trim("SIGNER_HOST")
            .parse::<IpAddr>()
            .unwrap_or(IpAddr::V6(Ipv6Addr::UNSPECIFIED));

        let db_path = env_path("SIGNER_DB_PATH", "./.data/slashing-signer.redb");
        let keys_path = env_path("SIGNER_KEYS_PATH", "./.data/keys.json");

        // An unparseable network must not silently fall back to mainnet.
        let network = match env_optional("SIGNER_NETWORK") {
            None => Network::default(),
            Some(raw) => raw.parse::<Network>().unwrap_or_else(|e| {
                invalid.push(format!("SIGNER_NETWORK: {e}"));
                Network::default()
            }),
        };

        let policy = SlashingPolicy {
            max_future_epochs: parse_u64(
                "SIGNER_MAX_FUTURE_EPOCHS",
                SlashingPolicy::DEFAULT_MAX_FUTURE_EPOCHS,
                &mut invalid,
            ),
            max_future_slots: parse_u64(
                "SIGNER_MAX_FUTURE_SLOTS",
                SlashingPolicy::DEFAULT_MAX_FUTURE_SLOTS,
                &mut invalid,
            ),
        };

        let body_limit_mb = env_trim("SIGNER_BODY_LIMIT_MB")
            .parse::<usize>()
            .unwrap_or(DEFAULT_BODY_LIMIT_MB);
        let body_limit_bytes = body_limit_mb.saturating_mul(1024 * 1024);

        let audit_key = env_optional("SIGNER_AUDIT_KEY").map(Zeroizing::new);
        let internal_token = env_optional("INTERNAL_SERVICE_TOKEN");

        // Determine if token is required based on environment
        let node_env = env_lower("NODE_ENV");
        let app_env = env_lower("APP_ENV");
        let rust_env = env_lower("RUST_ENV");
        let is_production = matches!(node_env.as_str(), "production")
            || matches!(app_env.as_str(), "production")
            || matches!(rust_env.as_str(), "production");
        let internal_token_required =
            is_production || is_truthy(&env_lower("INTERNAL_SERVICE_TOKEN_REQUIRED"));

        Self {
            port,
            host,
            db_path,
            keys_path,
            network,
            policy,
            body_limit_bytes,
            audit_key,
            internal_token,
            internal_token_required,
            invalid,
        }
    }

    /// Create settings for tests.
    pub fn for_tests() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            db_path: PathBuf::from("./.data/test-slashing-signer.redb"),
            keys_path: PathBuf::from("./.data/test-keys.json"),
            network: Network::Holesky,
            policy: SlashingPolicy::default(),
            body_limit_bytes: DEFAULT_BODY_LIMIT_MB * 1024 * 1024,
            audit_key: None,
            internal_token: None,
            internal_token_required: false,
            invalid: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_internal_token(mut self, token: &str) -> Self {
        self.internal_token = Some(token.to_string());
        self.internal_token_required = true;
        self
    }

    /// Validate settings.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(problem) = self.invalid.first() {
            return Err(format!("Invalid configuration. {problem}"));
        }

        if self.internal_token_required && self.internal_token.is_none() {
            return Err("INTERNAL_SERVICE_TOKEN is required in production. \
                 Set INTERNAL_SERVICE_TOKEN or INTERNAL_SERVICE_TOKEN_REQUIRED=0."
                .to_string());
        }

        if self.policy.max_future_epochs == 0 || self.policy.max_future_slots == 0 {
            return Err("SIGNER_MAX_FUTURE_EPOCHS and SIGNER_MAX_FUTURE_SLOTS must be positive."
                .to_string());
        }

        Ok(())
    }

    // Getters

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    pub fn keys_path(&self) -> &PathBuf {
        &self.keys_path
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn policy(&self) -> SlashingPolicy {
        self.policy
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_bytes
    }

    pub fn audit_key(&self) -> Option<&str> {
        self.audit_key.as_ref().map(|key| key.as_str())
    }

    pub fn internal_token(&self) -> Option<&str> {
        self.internal_token.as_deref()
    }

    pub fn internal_token_required(&self) -> bool {
        self.internal_token_required
    }
}

fn parse_u64(name: &str, default: u64, invalid: &mut Vec<String>) -> u64 {
    let raw = env_trim(name);
    if raw.is_empty() {
        return default;
    }
    raw.parse().unwrap_or_else(|_| {
        invalid.push(format!("{name}: '{raw}' is not a non-negative integer"));
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_validation() {
        let settings = Settings::for_tests();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.policy(), SlashingPolicy::default());
    }

    #[test]
    fn test_token_required_without_token() {
        let mut settings = Settings::for_tests();
        settings.internal_token_required = true;
        assert!(settings.validate().is_err());

        let settings = Settings::for_tests().with_internal_token("secret");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let mut settings = Settings::for_tests();
        settings.invalid.push("SIGNER_NETWORK: bad".to_string());
        let err = settings.validate().unwrap_err();
        assert!(err.contains("SIGNER_NETWORK"));
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let mut settings = Settings::for_tests();
        settings.policy.max_future_epochs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let settings = Settings::for_tests().with_internal_token("super-secret");
        assert!(!format!("{settings:?}").contains("super-secret"));
    }
}
