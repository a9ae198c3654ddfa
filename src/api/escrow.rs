// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Escrow balance endpoints.
//!
//! Deposits and spends act on the authenticated caller's account.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::Auth,
    blockchain::is_valid_address,
    error::{ApiError, GatewayError},
    models::{EscrowAmountRequest, EscrowBalanceResponse, EscrowDetailsResponse},
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/v1/escrow/deposit",
    tag = "Escrow",
    security(("bearer_auth" = []), ("api_key" = [])),
    request_body = EscrowAmountRequest,
    responses(
        (status = 200, description = "Deposit recorded", body = EscrowBalanceResponse),
        (status = 400, description = "Invalid amount"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn deposit(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Json(request): Json<EscrowAmountRequest>,
) -> Result<Json<EscrowBalanceResponse>, ApiError> {
    let entry = state.escrow.deposit(&caller.wallet_address, request.amount)?;
    Ok(Json(EscrowBalanceResponse {
        wallet_address: caller.wallet_address,
        balance: entry.balance_after,
        entry,
    }))
}

/// Spend from the caller's balance. Insufficient funds is a 400 here.
#[utoipa::path(
    post,
    path = "/v1/escrow/spend",
    tag = "Escrow",
    security(("bearer_auth" = []), ("api_key" = [])),
    request_body = EscrowAmountRequest,
    responses(
        (status = 200, description = "Spend recorded", body = EscrowBalanceResponse),
        (status = 400, description = "Invalid amount or insufficient funds"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn spend(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Json(request): Json<EscrowAmountRequest>,
) -> Result<Json<EscrowBalanceResponse>, ApiError> {
    let entry = state
        .escrow
        .spend(&caller.wallet_address, request.amount)
        .map_err(|err| match err {
            GatewayError::InsufficientFunds { .. } => {
                ApiError::from(err).with_status(StatusCode::BAD_REQUEST)
            }
            other => ApiError::from(other),
        })?;
    Ok(Json(EscrowBalanceResponse {
        wallet_address: caller.wallet_address,
        balance: entry.balance_after,
        entry,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/escrow/{wallet}",
    tag = "Escrow",
    params(("wallet" = String, Path, description = "Base58 wallet address")),
    responses(
        (status = 200, description = "Balance and escrow log", body = EscrowDetailsResponse),
        (status = 400, description = "Invalid wallet address")
    )
)]
pub async fn escrow_details(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Result<Json<EscrowDetailsResponse>, ApiError> {
    if !is_valid_address(&wallet) {
        return Err(ApiError::bad_request(format!("Invalid wallet address: {wallet}")));
    }
    let balance = state.escrow.balance(&wallet)?;
    let entries = state.escrow.history(&wallet)?;
    Ok(Json(EscrowDetailsResponse {
        wallet_address: wallet,
        balance,
        entries,
    }))
}
