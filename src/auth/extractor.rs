// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated callers.
//!
//! A caller authenticates with either:
//! - `X-API-Key: <key>` (checked first; each use is counted), or
//! - `Authorization: Bearer <session token>`
//!
//! ```rust,ignore
//! async fn my_handler(Auth(caller): Auth) -> impl IntoResponse {
//!     // caller.wallet_address is the authenticated wallet
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::AuthError;
use crate::state::AppState;

/// Header carrying an API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// How the caller proved its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Session,
    ApiKey { name: String },
}

/// An authenticated wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub wallet_address: String,
    pub credential: Credential,
}

/// Extractor that requires a valid session token or API key.
pub struct Auth(pub Caller);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(value) = parts.headers.get(API_KEY_HEADER) {
            let key = value.to_str().map_err(|_| AuthError::InvalidApiKey)?.trim();
            let record = state
                .api_keys
                .record_usage(key)?
                .filter(|record| record.active)
                .ok_or(AuthError::InvalidApiKey)?;
            return Ok(Auth(Caller {
                wallet_address: record.wallet_address,
                credential: Credential::ApiKey { name: record.name },
            }));
        }

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingCredentials)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?
            .trim();

        let wallet_address = state
            .sessions
            .wallet_for_token(token)?
            .ok_or(AuthError::InvalidSession)?;

        Ok(Auth(Caller {
            wallet_address,
            credential: Credential::Session,
        }))
    }
}

/// Authentication attempted but not yet enforced.
///
/// Lets a handler answer `404` for an unknown resource before deciding
/// whether the caller is authenticated.
pub struct DeferredAuth(pub Result<Caller, AuthError>);

impl DeferredAuth {
    pub fn require(self) -> Result<Caller, AuthError> {
        self.0
    }
}

impl FromRequestParts<AppState> for DeferredAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(DeferredAuth(
            Auth::from_request_parts(parts, state)
                .await
                .map(|Auth(caller)| caller),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_state, W1};
    use axum::http::Request;

    fn parts_with(header: Option<(&str, String)>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn requires_credentials() {
        let (state, _dir) = test_state();
        let mut parts = parts_with(None);

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingCredentials)));
    }

    #[tokio::test]
    async fn accepts_session_token() {
        let (state, _dir) = test_state();
        let session = state.sessions.create_session(W1).unwrap();
        let mut parts = parts_with(Some(("Authorization", format!("Bearer {}", session.token))));

        let Auth(caller) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(caller.wallet_address, W1);
        assert_eq!(caller.credential, Credential::Session);
    }

    #[tokio::test]
    async fn rejects_malformed_header_and_unknown_token() {
        let (state, _dir) = test_state();

        let mut parts = parts_with(Some(("Authorization", "Basic abc".to_string())));
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));

        let mut parts = parts_with(Some(("Authorization", "Bearer nope".to_string())));
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidSession)));
    }

    #[tokio::test]
    async fn accepts_api_key_and_counts_usage() {
        let (state, _dir) = test_state();
        let record = state.api_keys.issue(W1, "ci").unwrap();
        let mut parts = parts_with(Some(("X-API-Key", record.key.clone())));

        let Auth(caller) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(caller.wallet_address, W1);
        assert_eq!(caller.credential, Credential::ApiKey { name: "ci".into() });
        assert_eq!(state.api_keys.list(W1).unwrap()[0].usage_count, 1);
    }

    #[tokio::test]
    async fn rejects_revoked_api_key() {
        let (state, _dir) = test_state();
        let record = state.api_keys.issue(W1, "ci").unwrap();
        state.api_keys.revoke(W1, "ci").unwrap();
        let mut parts = parts_with(Some(("X-API-Key", record.key)));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidApiKey)));
    }

    #[tokio::test]
    async fn deferred_auth_never_rejects() {
        let (state, _dir) = test_state();
        let mut parts = parts_with(None);

        let DeferredAuth(result) = DeferredAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(matches!(result, Err(AuthError::MissingCredentials)));
    }
}
