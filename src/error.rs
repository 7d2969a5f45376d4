//! Error types for the slashing signer.
//!
//! Policy refusals (`Refused`) are kept apart from infrastructure faults
//! (`Storage`, `SigningFailed`) so operators can tell "the signer said no"
//! from "the signer is broken". Message text for refusals is stable: clients
//! match on it.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the slashing evaluator refused to sign.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Refusal {
    #[error("source epoch too far into the future")]
    FarFutureSourceEpoch,

    #[error("target epoch too far into the future")]
    FarFutureTargetEpoch,

    #[error("proposed block slot too far into the future")]
    FarFutureSlot,

    #[error("highest attestation data is nil, can't determine if attestation is slashable")]
    NoBaselineSlashingData,

    #[error("slashable attestation (DoubleVote), not signing")]
    DoubleVote,

    #[error("slashable attestation (SurroundVote), not signing")]
    SurroundVote,

    #[error("slashable proposal (DoubleProposal), not signing")]
    DoubleProposal,
}

impl Refusal {
    /// Machine-readable code for this refusal.
    pub fn code(self) -> &'static str {
        match self {
            Self::FarFutureSourceEpoch => "FAR_FUTURE_SOURCE_EPOCH",
            Self::FarFutureTargetEpoch => "FAR_FUTURE_TARGET_EPOCH",
            Self::FarFutureSlot => "FAR_FUTURE_SLOT",
            Self::NoBaselineSlashingData => "NO_BASELINE_SLASHING_DATA",
            Self::DoubleVote => "DOUBLE_VOTE",
            Self::SurroundVote => "SURROUND_VOTE",
            Self::DoubleProposal => "DOUBLE_PROPOSAL",
        }
    }

    /// True for refusals that prove the request would be slashable, as
    /// opposed to ones we refuse because we cannot prove it is safe.
    pub fn is_slashable(self) -> bool {
        matches!(
            self,
            Self::DoubleVote | Self::SurroundVote | Self::DoubleProposal
        )
    }
}

/// Service error type with structured error responses.
#[derive(Error, Debug)]
pub enum SignerError {
    #[error("account not found")]
    AccountNotFound,

    #[error(transparent)]
    Refused(#[from] Refusal),

    /// Another request for the same public key is in flight.
    #[error("locked")]
    Locked,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid input: {0}")]
    Deserialization(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl SignerError {
    /// Get the error code for structured error responses.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::AccountNotFound => Some("ACCOUNT_NOT_FOUND"),
            Self::Refused(refusal) => Some(refusal.code()),
            Self::Locked => Some("LOCKED"),
            Self::Storage(_) => Some("STORAGE_ERROR"),
            Self::SigningFailed(_) => Some("SIGNING_FAILED"),
            Self::InvalidInput(_) | Self::Deserialization(_) => Some("INVALID_INPUT"),
            Self::Serialization(_) => Some("SERIALIZATION_ERROR"),
            Self::Unauthorized => Some("UNAUTHORIZED"),
            Self::Config(_) => Some("CONFIG_ERROR"),
            Self::Internal(_) => None, // Don't expose internal error codes
        }
    }

    /// The refusal kind, if this is a policy refusal.
    pub fn refusal(&self) -> Option<Refusal> {
        match self {
            Self::Refused(refusal) => Some(*refusal),
            _ => None,
        }
    }
}

impl ResponseError for SignerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::Deserialization(_) => StatusCode::BAD_REQUEST,

            Self::Unauthorized => StatusCode::UNAUTHORIZED,

            Self::AccountNotFound => StatusCode::NOT_FOUND,

            // Transient, caller should retry
            Self::Locked => StatusCode::CONFLICT,

            Self::Refused(_) => StatusCode::UNPROCESSABLE_ENTITY,

            Self::Storage(_)
            | Self::SigningFailed(_)
            | Self::Serialization(_)
            | Self::Config(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = ErrorResponse {
            errors: vec![self.to_string()],
            code: self.error_code().map(String::from),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<std::io::Error> for SignerError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SignerError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            Self::Deserialization(err.to_string())
        } else {
            Self::Serialization(err.to_string())
        }
    }
}

impl From<redb::Error> for SignerError {
    fn from(err: redb::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<redb::DatabaseError> for SignerError {
    fn from(err: redb::DatabaseError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<redb::TableError> for SignerError {
    fn from(err: redb::TableError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<redb::TransactionError> for SignerError {
    fn from(err: redb::TransactionError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<redb::CommitError> for SignerError {
    fn from(err: redb::CommitError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<redb::StorageError> for SignerError {
    fn from(err: redb::StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result type alias for signer operations.
pub type SignerResult<T> = Result<T, SignerError>;
