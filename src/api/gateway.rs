// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Capability listing, pricing and routed calls.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::{
    auth::DeferredAuth,
    error::ApiError,
    models::{CapabilitiesResponse, LanguageInfo, LanguagesResponse, PriceResponse, RouteRequest},
    providers::SUPPORTED_LANGUAGES,
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/v1/capabilities",
    tag = "Gateway",
    responses(
        (status = 200, description = "Registered capabilities and prices", body = CapabilitiesResponse)
    )
)]
pub async fn list_capabilities(State(state): State<AppState>) -> Json<CapabilitiesResponse> {
    Json(CapabilitiesResponse {
        capabilities: state.router.capabilities(),
    })
}

#[utoipa::path(
    get,
    path = "/v1/languages",
    tag = "Gateway",
    responses(
        (status = 200, description = "Target languages supported by the translator", body = LanguagesResponse)
    )
)]
pub async fn list_languages() -> Json<LanguagesResponse> {
    let languages = SUPPORTED_LANGUAGES
        .iter()
        .map(|(code, name)| LanguageInfo {
            code: (*code).to_string(),
            name: (*name).to_string(),
        })
        .collect();
    Json(LanguagesResponse { languages })
}

#[utoipa::path(
    get,
    path = "/v1/price/{capability}",
    tag = "Gateway",
    params(("capability" = String, Path, description = "Capability name")),
    responses(
        (status = 200, description = "Price per call in lamports", body = PriceResponse),
        (status = 404, description = "Unknown capability")
    )
)]
pub async fn get_price(
    State(state): State<AppState>,
    Path(capability): Path<String>,
) -> Result<Json<PriceResponse>, ApiError> {
    let price = state
        .router
        .price_of(&capability)
        .ok_or_else(|| ApiError::not_found(format!("Capability '{capability}' not found")))?;
    Ok(Json(PriceResponse { capability, price }))
}

/// Invoke a capability.
///
/// With `tx_signature` the call is paid by that on-chain transaction,
/// otherwise by the caller's escrow balance. The response is the provider
/// result plus `status`, `price`, `transaction_id` and `tx_verified`.
#[utoipa::path(
    post,
    path = "/v1/route/{capability}",
    tag = "Gateway",
    security(("bearer_auth" = []), ("api_key" = [])),
    params(("capability" = String, Path, description = "Capability name")),
    request_body = RouteRequest,
    responses(
        (status = 200, description = "Capability result as a JSON object"),
        (status = 400, description = "Invalid parameters"),
        (status = 401, description = "Unauthorized"),
        (status = 402, description = "Insufficient escrow balance"),
        (status = 403, description = "Payment proof rejected"),
        (status = 404, description = "Unknown capability"),
        (status = 502, description = "Provider or chain failure")
    )
)]
pub async fn route_capability(
    State(state): State<AppState>,
    Path(capability): Path<String>,
    auth: DeferredAuth,
    Json(request): Json<RouteRequest>,
) -> Result<Json<Value>, ApiError> {
    if !state.router.has(&capability) {
        return Err(ApiError::not_found(format!("Capability '{capability}' not found")));
    }
    let caller = auth.require()?;

    let result = state
        .router
        .route(
            &caller.wallet_address,
            &capability,
            request.params,
            request.tx_signature.as_deref(),
        )
        .await?;
    Ok(Json(Value::Object(result)))
}
