use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified application error.
///
/// Used by the binary entry point and the HTTP layer. The snapshot engine
/// itself never surfaces one of these: chain failures travel through the
/// `status` field of each entry instead.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Network(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) | AppError::Parse(_) | AppError::Unknown(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Failure of a single upstream provider call.
///
/// Local to one provider: callers log it, count it, and move on with
/// one candidate fewer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("provider unavailable: {message}")]
    Unavailable { message: String },

    #[error("provider timed out")]
    Timeout,

    #[error("provider returned HTTP {status}")]
    Status { status: u16 },

    #[error("unexpected response format: {message}")]
    Format { message: String },

    #[error("json-rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("implausible value rejected: {message}")]
    Implausible { message: String },

    #[error("symbol {symbol} not supported by this source")]
    Unsupported { symbol: String },
}

impl ProviderError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::Format { message: message.into() }
    }

    pub fn implausible(message: impl Into<String>) -> Self {
        Self::Implausible { message: message.into() }
    }
}

/// Errors raised while building a snapshot.
///
/// All of these are recovered at the chain boundary by the orchestrator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SnapshotError {
    #[error("no price source returned a usable USD price for {symbol}")]
    PriceUnavailable { symbol: String },

    #[error("no usable fee candidate survived validation for {chain}")]
    ValidationFailed { chain: String },

    #[error("unknown chain: {key}")]
    UnknownChain { key: String },

    #[error("unsupported chain type: {value}")]
    UnsupportedChainType { value: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("build task for {chain} aborted unexpectedly")]
    ChainBuildPanicked { chain: String },
}

impl From<SnapshotError> for AppError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::UnknownChain { key } => AppError::NotFound(format!("chain {}", key)),
            SnapshotError::Config { message } => AppError::Config(message),
            SnapshotError::UnsupportedChainType { value } => {
                AppError::Config(format!("unsupported chain type {}", value))
            }
            other => AppError::Unknown(other.to_string()),
        }
    }
}
