// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    blockchain::is_valid_address, error::ApiError, models::TransactionHistoryResponse,
    state::AppState,
};

/// Capability transactions of a wallet, newest first.
#[utoipa::path(
    get,
    path = "/v1/transactions/{wallet}",
    tag = "Transactions",
    params(("wallet" = String, Path, description = "Base58 wallet address")),
    responses(
        (status = 200, description = "Transaction history", body = TransactionHistoryResponse),
        (status = 400, description = "Invalid wallet address")
    )
)]
pub async fn transaction_history(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Result<Json<TransactionHistoryResponse>, ApiError> {
    if !is_valid_address(&wallet) {
        return Err(ApiError::bad_request(format!("Invalid wallet address: {wallet}")));
    }
    let transactions = state.router.transaction_history(&wallet)?;
    Ok(Json(TransactionHistoryResponse {
        wallet_address: wallet,
        transactions,
    }))
}
