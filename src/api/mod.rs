// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::API_KEY_HEADER,
    gateway::CapabilityInfo,
    models::{
        ApiKeyListResponse, ApiKeyResponse, CapabilitiesResponse, CreateApiKeyRequest,
        CreateSessionRequest, EscrowAmountRequest, EscrowBalanceResponse, EscrowDetailsResponse,
        InvalidateSessionResponse, LanguageInfo, LanguagesResponse, PriceResponse, RouteRequest,
        SessionResponse, SessionValidity, TransactionHistoryResponse,
    },
    state::AppState,
    storage::{EscrowEntry, EscrowEntryKind, PaymentMethod, StoredTransaction, TxStatus},
};

pub mod api_keys;
pub mod escrow;
pub mod gateway;
pub mod health;
pub mod sessions;
pub mod transactions;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route(
            "/session",
            get(sessions::session_validity)
                .post(sessions::create_session)
                .delete(sessions::invalidate_session),
        )
        .route(
            "/api-keys",
            get(api_keys::list_api_keys).post(api_keys::create_api_key),
        )
        .route("/api-keys/{name}", delete(api_keys::revoke_api_key))
        .route("/capabilities", get(gateway::list_capabilities))
        .route("/languages", get(gateway::list_languages))
        .route("/price/{capability}", get(gateway::get_price))
        .route("/route/{capability}", post(gateway::route_capability))
        .route(
            "/transactions/{wallet}",
            get(transactions::transaction_history),
        )
        .route("/escrow/deposit", post(escrow::deposit))
        .route("/escrow/spend", post(escrow::spend))
        .route("/escrow/{wallet}", get(escrow::escrow_details))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state)
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        sessions::create_session,
        sessions::session_validity,
        sessions::invalidate_session,
        api_keys::create_api_key,
        api_keys::list_api_keys,
        api_keys::revoke_api_key,
        gateway::list_capabilities,
        gateway::list_languages,
        gateway::get_price,
        gateway::route_capability,
        transactions::transaction_history,
        escrow::deposit,
        escrow::spend,
        escrow::escrow_details
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            CreateSessionRequest,
            SessionResponse,
            SessionValidity,
            InvalidateSessionResponse,
            CreateApiKeyRequest,
            ApiKeyResponse,
            ApiKeyListResponse,
            CapabilityInfo,
            CapabilitiesResponse,
            LanguageInfo,
            LanguagesResponse,
            PriceResponse,
            RouteRequest,
            StoredTransaction,
            TxStatus,
            PaymentMethod,
            TransactionHistoryResponse,
            EscrowAmountRequest,
            EscrowBalanceResponse,
            EscrowDetailsResponse,
            EscrowEntry,
            EscrowEntryKind
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Sessions", description = "Wallet sessions"),
        (name = "API Keys", description = "Long-lived named credentials"),
        (name = "Gateway", description = "Priced capabilities"),
        (name = "Transactions", description = "Capability transaction history"),
        (name = "Escrow", description = "Escrow balance ledger")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(API_KEY_HEADER))),
            );
        }
    }
}
