// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;
use crate::storage::StoreError;

// =============================================================================
// Domain Errors
// =============================================================================

/// Typed failure of a gateway operation.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing, invalid or expired session / API key
    #[error("{0}")]
    Unauthorized(String),

    /// Unknown capability, wallet or transaction
    #[error("{0}")]
    NotFound(String),

    /// Payment proof failed verification or was already redeemed
    #[error("Payment rejected: {0}")]
    PaymentRejected(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    /// Duplicate transaction or API key name
    #[error("{0}")]
    Conflict(String),

    /// Provider or chain RPC failed or timed out
    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    /// Malformed input rejected before any mutation
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl GatewayError {
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::Unauthorized(_) => "unauthorized",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::PaymentRejected(_) => "payment_rejected",
            GatewayError::InsufficientFunds { .. } => "insufficient_funds",
            GatewayError::Conflict(_) => "conflict",
            GatewayError::UpstreamFailure(_) => "upstream_failure",
            GatewayError::InvalidRequest(_) => "invalid_request",
            GatewayError::Storage(_) => "storage_error",
        }
    }

    /// HTTP status for this error on the capability routing path.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::PaymentRejected(_) => StatusCode::FORBIDDEN,
            GatewayError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
            GatewayError::Conflict(_) => StatusCode::CONFLICT,
            GatewayError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => GatewayError::NotFound(format!("{what} not found")),
            StoreError::Conflict(what) => GatewayError::Conflict(format!("{what} already exists")),
            StoreError::InvalidState(msg) => GatewayError::Conflict(msg),
            StoreError::InsufficientFunds { available, required } => {
                GatewayError::InsufficientFunds { required, available }
            }
            StoreError::Overflow(wallet) => {
                GatewayError::InvalidRequest(format!("Balance overflow for {wallet}"))
            }
            other => GatewayError::Storage(other.to_string()),
        }
    }
}

// =============================================================================
// HTTP Error
// =============================================================================

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        let code = match status {
            StatusCode::BAD_REQUEST => "invalid_request",
            StatusCode::UNAUTHORIZED => "unauthorized",
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::CONFLICT => "conflict",
            StatusCode::SERVICE_UNAVAILABLE => "unavailable",
            _ => "internal_error",
        };
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Keep the code and message but answer with a different status.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        if let GatewayError::Storage(msg) = &err {
            tracing::error!(error = %msg, "Storage failure while serving request");
        }
        Self {
            status: err.status_code(),
            code: err.error_code(),
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        GatewayError::from(err).into()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if let AuthError::InternalError(msg) = &err {
            tracing::error!(error = %msg, "Credential lookup failed");
        }
        Self {
            status: err.status_code(),
            code: err.error_code(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.code,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.code, "not_found");
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad");
    }

    #[test]
    fn gateway_errors_map_to_http_statuses() {
        let cases = [
            (GatewayError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (GatewayError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (GatewayError::PaymentRejected("x".into()), StatusCode::FORBIDDEN),
            (
                GatewayError::InsufficientFunds { required: 2, available: 1 },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (GatewayError::Conflict("x".into()), StatusCode::CONFLICT),
            (GatewayError::UpstreamFailure("x".into()), StatusCode::BAD_GATEWAY),
            (GatewayError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (GatewayError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn store_errors_convert_to_domain_errors() {
        let err: GatewayError = StoreError::InsufficientFunds { available: 5, required: 9 }.into();
        assert!(matches!(
            err,
            GatewayError::InsufficientFunds { required: 9, available: 5 }
        ));

        let err: GatewayError = StoreError::Conflict("API key name 'ci'".into()).into();
        assert!(matches!(err, GatewayError::Conflict(_)));

        let err: GatewayError = StoreError::Poisoned.into();
        assert!(matches!(err, GatewayError::Storage(_)));
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data","error_code":"invalid_request"}"#);
    }

    #[tokio::test]
    async fn spend_maps_insufficient_funds_to_400() {
        let err = ApiError::from(GatewayError::InsufficientFunds { required: 2, available: 1 })
            .with_status(StatusCode::BAD_REQUEST);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "insufficient_funds");
    }
}
