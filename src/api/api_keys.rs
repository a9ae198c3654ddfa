// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API key management for the authenticated wallet.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{ApiKeyListResponse, ApiKeyResponse, CreateApiKeyRequest},
    state::AppState,
};

/// Issue a named API key.
///
/// The key value is only ever returned by this call.
#[utoipa::path(
    post,
    path = "/v1/api-keys",
    tag = "API Keys",
    security(("bearer_auth" = []), ("api_key" = [])),
    request_body = CreateApiKeyRequest,
    responses(
        (status = 201, description = "Key issued", body = ApiKeyResponse),
        (status = 400, description = "Invalid name"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "A key with this name already exists")
    )
)]
pub async fn create_api_key(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<ApiKeyResponse>), ApiError> {
    let record = state.api_keys.issue(&caller.wallet_address, &request.name)?;
    Ok((StatusCode::CREATED, Json(ApiKeyResponse::issued(record))))
}

#[utoipa::path(
    get,
    path = "/v1/api-keys",
    tag = "API Keys",
    security(("bearer_auth" = []), ("api_key" = [])),
    responses(
        (status = 200, description = "Keys of the caller, newest first", body = ApiKeyListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_api_keys(
    Auth(caller): Auth,
    State(state): State<AppState>,
) -> Result<Json<ApiKeyListResponse>, ApiError> {
    let api_keys: Vec<ApiKeyResponse> = state
        .api_keys
        .list(&caller.wallet_address)?
        .into_iter()
        .map(ApiKeyResponse::from)
        .collect();
    let total = api_keys.len();
    Ok(Json(ApiKeyListResponse { api_keys, total }))
}

#[utoipa::path(
    delete,
    path = "/v1/api-keys/{name}",
    tag = "API Keys",
    security(("bearer_auth" = []), ("api_key" = [])),
    params(("name" = String, Path, description = "Key name")),
    responses(
        (status = 204, description = "Key revoked"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No key with this name")
    )
)]
pub async fn revoke_api_key(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.api_keys.revoke(&caller.wallet_address, &name)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("API key '{name}' not found")))
    }
}
