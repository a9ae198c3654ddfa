// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{error::Error, sync::Arc};

use capability_gateway::{
    api::router,
    auth::SessionSweeper,
    blockchain::{PaymentVerifier, SolanaRpcClient},
    config::{GatewayConfig, LogFormat},
    gateway::CapabilityRouter,
    providers::{default_registry, OpenAiChatClient},
    state::AppState,
    storage::{KvStore, LedgerStore, LEDGER_DB_FILE},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = GatewayConfig::from_env()?;
    init_tracing(config.log_format);

    let ledger_path = config.data_dir.join(LEDGER_DB_FILE);
    let ledger = Arc::new(LedgerStore::open(&ledger_path)?);
    info!(path = %ledger_path.display(), "Ledger opened");

    let stale = ledger.fail_stale_pending()?;
    if !stale.is_empty() {
        warn!(
            count = stale.len(),
            transaction_ids = ?stale,
            "Marked transactions left pending by a previous run as failed"
        );
    }

    let model = OpenAiChatClient::new(
        &config.llm_api_url,
        config.llm_api_key.clone(),
        &config.llm_model,
        config.provider_timeout,
    )?;
    if config.llm_api_key.is_none() {
        warn!("LLM_API_KEY not set, capability calls will fail upstream");
    }
    let registry = default_registry(Arc::new(model), &config.prices);

    let chain = SolanaRpcClient::new(&config.solana_rpc_url, config.rpc_timeout)?;
    if config.program_id.is_none() {
        warn!("PROGRAM_ID not set, on-chain payments will be rejected");
    }
    let kv: Arc<dyn KvStore> = ledger.clone();
    let verifier = PaymentVerifier::new(
        Arc::new(chain),
        kv.clone(),
        config.program_id.clone(),
        config.rpc_timeout,
    );

    let capability_router = CapabilityRouter::new(registry, ledger.clone(), Arc::new(verifier))
        .with_provider_timeout(config.provider_timeout);
    let state = AppState::new(ledger, Arc::new(capability_router))
        .with_session_ttl(config.session_ttl);
    let app = router(state);

    let shutdown = CancellationToken::new();
    let sweeper = SessionSweeper::new(kv, config.session_sweep_interval);
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown.clone()));

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!(
        addr = %listener.local_addr()?,
        rpc = %config.solana_rpc_url,
        "Capability gateway listening (docs at /docs)"
    );

    let signal_token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown signal received");
            signal_token.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = sweeper_handle.await {
        warn!(error = %e, "Session sweeper did not stop cleanly");
    }
    info!("Capability gateway stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
