use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boomie_api::{
    auth::{FirebaseAuth, IdentityVerifier},
    config::Config,
    db::{create_pool, create_redis_client, Cache, MemoryStore, PgStore, Store},
    routes::{create_router, AppState},
    services::{
        BoomieAgent, CatalogProvider, GeminiClient, LanguageModel, RecommendationService,
        SpotifyClient,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boomie_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = create_pool(url).await?;
            tracing::info!("Connected to PostgreSQL");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, keeping data in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let (cache, cache_handle) = match config.redis_url.as_deref() {
        Some(url) => {
            let client = create_redis_client(url)?;
            tracing::info!("Catalog cache enabled");
            Cache::new(client)
        }
        None => {
            tracing::warn!("REDIS_URL not set, catalog lookups are not cached");
            Cache::disabled()
        }
    };

    let catalog: Arc<dyn CatalogProvider> = Arc::new(SpotifyClient::new(
        cache,
        config.spotify_client_id.clone(),
        config.spotify_client_secret.clone(),
        config.spotify_api_url.clone(),
        config.spotify_accounts_url.clone(),
    ));

    let model: Arc<dyn LanguageModel> = Arc::new(GeminiClient::new(
        config.google_generative_ai_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_api_url.clone(),
    ));

    let service_account = config
        .firebase_service_account_json
        .as_deref()
        .map(FirebaseAuth::parse_service_account)
        .transpose()?;
    if service_account.is_none() {
        tracing::warn!("No Firebase service account configured, account deletion will fail");
    }
    let identity: Arc<dyn IdentityVerifier> = Arc::new(FirebaseAuth::new(
        config.firebase_project_id.clone(),
        service_account,
    ));

    let agent = BoomieAgent::new(model, catalog.clone(), config.max_tool_iterations);
    let recommendations = Arc::new(RecommendationService::new(
        store.clone(),
        agent,
        catalog,
        config.max_verification_attempts,
    ));

    let app = create_router(AppState {
        store,
        identity,
        recommendations,
    });

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Boomie API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_handle.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
