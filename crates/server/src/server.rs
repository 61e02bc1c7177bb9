//! Service startup and graceful shutdown.

use crate::routes::{self, AppState};
use anyhow::Context;
use rulegate_ask::{AskSettings, Orchestrator, RateLimiter};
use rulegate_core::{auth, AppConfig};
use rulegate_llm::{create_client, LlmSettings, RulesGenerator};
use rulegate_prompt::load_prompts;
use rulegate_rag::VertexRagClient;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Build the backends once and serve until SIGINT/SIGTERM.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let prompts = load_prompts(&config.prompts_path)
        .with_context(|| format!("loading prompts from {:?}", config.prompts_path))?;

    let tokens = auth::token_source(config.resolve_access_token())
        .await
        .context("loading Google Cloud credentials")?;

    let llm = create_client(&LlmSettings::from_config(&config), Arc::clone(&tokens))
        .context("creating LLM client")?;
    tracing::info!(
        provider = llm.provider_name(),
        model = %config.model,
        rewrite_model = %config.rewrite_model(),
        "LLM client ready"
    );

    let generator = RulesGenerator::new(
        llm,
        Arc::new(prompts),
        config.model.clone(),
        config.rewrite_model(),
    );

    let retriever = VertexRagClient::new(
        &config.project_id,
        &config.region,
        tokens,
        Duration::from_secs(config.backend_timeout_secs.max(1)),
    )
    .context("creating retrieval client")?;

    let orchestrator = Orchestrator::new(
        Arc::new(retriever),
        Arc::new(generator),
        AskSettings::from_config(&config),
    );

    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_rps,
        config.rate_limit_burst,
    ));
    let sweeper = spawn_limiter_sweep(
        Arc::clone(&limiter),
        Duration::from_secs(config.rate_limit_idle_secs),
    );

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        limiter,
        allow_origin: Arc::from(config.allow_origin.as_str()),
        request_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    let settings = state.orchestrator.settings();
    tracing::info!(
        port = config.port,
        corpus = %settings.corpus_id,
        top_k = settings.default_top_k,
        min_confidence = settings.default_min_confidence,
        "Server starting"
    );

    let stop = Arc::new(Notify::new());
    let server = axum::serve(
        listener,
        routes::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown({
        let stop = Arc::clone(&stop);
        async move { stop.notified().await }
    });
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        joined = &mut server => {
            sweeper.abort();
            joined.context("server task failed")?.context("server error")?;
            return Ok(());
        }
        _ = shutdown_signal() => {}
    }

    // Stop accepting and let in-flight requests drain
    stop.notify_one();
    sweeper.abort();

    let grace = Duration::from_secs(config.shutdown_grace_secs);
    match tokio::time::timeout(grace, server).await {
        Ok(joined) => {
            joined.context("server task failed")?.context("server error")?;
            tracing::info!("Server stopped gracefully");
        }
        Err(_) => {
            tracing::warn!(
                grace_secs = config.shutdown_grace_secs,
                "Grace period elapsed with requests still in flight"
            );
        }
    }

    Ok(())
}

/// Periodically drop rate-limit buckets idle longer than `max_idle` and fully refilled.
fn spawn_limiter_sweep(limiter: Arc<RateLimiter>, max_idle: Duration) -> JoinHandle<()> {
    let period = (max_idle / 2).max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = limiter.evict_idle(max_idle);
            if removed > 0 {
                tracing::debug!(
                    removed,
                    remaining = limiter.tracked_identities(),
                    "Evicted idle rate-limit buckets"
                );
            }
        }
    })
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for SIGINT: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Shutdown signal received: SIGINT"),
        _ = terminate => tracing::info!("Shutdown signal received: SIGTERM"),
    }
}
