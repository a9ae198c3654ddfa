// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session endpoints: wallet login, token validity and logout.

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    auth::Auth,
    error::{ApiError, GatewayError},
    models::{
        CreateSessionRequest, InvalidateSessionResponse, SessionQuery, SessionResponse,
        SessionValidity,
    },
    state::AppState,
};

/// Start a session for a wallet.
///
/// Any previous session of the wallet stops being valid.
#[utoipa::path(
    post,
    path = "/v1/session",
    tag = "Sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session created", body = SessionResponse),
        (status = 400, description = "Invalid wallet address")
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.sessions.create_session(request.wallet_address.trim())?;
    Ok(Json(session.into()))
}

/// Check a session token.
#[utoipa::path(
    get,
    path = "/v1/session",
    tag = "Sessions",
    params(SessionQuery),
    responses(
        (status = 200, description = "Token is valid", body = SessionValidity),
        (status = 401, description = "Token is unknown or expired")
    )
)]
pub async fn session_validity(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<SessionValidity>, ApiError> {
    let wallet_address = state
        .sessions
        .wallet_for_token(&query.token)?
        .ok_or_else(|| GatewayError::Unauthorized("Invalid or expired session".to_string()))?;

    Ok(Json(SessionValidity {
        valid: true,
        wallet_address,
    }))
}

/// End the caller's session.
#[utoipa::path(
    delete,
    path = "/v1/session",
    tag = "Sessions",
    security(("bearer_auth" = []), ("api_key" = [])),
    responses(
        (status = 200, description = "Session removed", body = InvalidateSessionResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn invalidate_session(
    Auth(caller): Auth,
    State(state): State<AppState>,
) -> Result<Json<InvalidateSessionResponse>, ApiError> {
    let invalidated = state.sessions.invalidate(&caller.wallet_address)?;
    Ok(Json(InvalidateSessionResponse { invalidated }))
}
