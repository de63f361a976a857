use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::billing::gateway::BillingError;

#[derive(Debug)]
pub enum LicenceError {
    PreconditionError(String),
    PersistenceError(String),
    ValidationError(String),
    ConfigError(String),
    BillingError(BillingError),
    Other(String),
    RedisError(redis::RedisError),
    SerdeError(serde_json::Error),
}

impl std::fmt::Display for LicenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LicenceError::PreconditionError(msg) => write!(f, "Precondition failed: {}", msg),
            LicenceError::PersistenceError(msg) => write!(f, "Persistence error: {}", msg),
            LicenceError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            LicenceError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            LicenceError::BillingError(err) => write!(f, "Billing error: {}", err),
            LicenceError::Other(msg) => write!(f, "Other error: {}", msg),
            LicenceError::RedisError(err) => write!(f, "Redis error: {}", err),
            LicenceError::SerdeError(err) => write!(f, "Serde error: {}", err),
        }
    }
}

impl std::error::Error for LicenceError {}

impl IntoResponse for LicenceError {
    fn into_response(self) -> Response {
        let status = match &self {
            LicenceError::PreconditionError(_) => StatusCode::CONFLICT,
            LicenceError::ValidationError(_) | LicenceError::SerdeError(_) => {
                StatusCode::BAD_REQUEST
            }
            LicenceError::BillingError(_) => StatusCode::BAD_GATEWAY,
            LicenceError::RedisError(_) | LicenceError::PersistenceError(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            LicenceError::ConfigError(_) | LicenceError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<BillingError> for LicenceError {
    fn from(err: BillingError) -> Self {
        LicenceError::BillingError(err)
    }
}

impl From<redis::RedisError> for LicenceError {
    fn from(err: redis::RedisError) -> Self {
        LicenceError::RedisError(err)
    }
}

impl From<serde_json::Error> for LicenceError {
    fn from(err: serde_json::Error) -> Self {
        LicenceError::SerdeError(err)
    }
}

impl From<config::ConfigError> for LicenceError {
    fn from(err: config::ConfigError) -> Self {
        LicenceError::ConfigError(err.to_string())
    }
}
