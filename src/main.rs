// src/main.rs

use eduassess::catalog::Catalog;
use eduassess::config::Config;
use eduassess::recommend::{DisabledGateway, HttpRecommendationGateway, RecommendationGateway};
use eduassess::routes;
use eduassess::scroll::{FrameCache, ScrollPolicy};
use eduassess::session::SessionRegistry;
use eduassess::state::AppState;
use eduassess::store::{Repository, SqliteStore};
use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (.env included)
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    tracing::error!("Failed to open store after 5 retries: {}", e);
                    return Err(e.into());
                }
                tracing::warn!("Store not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Store connected...");

    // Run Migrations Automatically
    let store = SqliteStore::new(pool);
    tracing::info!("Running migrations...");
    store.migrate().await?;
    tracing::info!("Migrations applied successfully.");

    let catalog = Catalog::predefined()?;
    tracing::info!("Loaded {} predefined assessments", catalog.len());

    let gateway: Arc<dyn RecommendationGateway> = match &config.recommendation_url {
        Some(url) => {
            tracing::info!("Recommendations served by {}", url);
            Arc::new(HttpRecommendationGateway::new(
                url.clone(),
                config.recommendation_timeout,
            )?)
        }
        None => {
            tracing::warn!("RECOMMENDATION_URL not set; recommendations disabled");
            Arc::new(DisabledGateway)
        }
    };

    let frames = Arc::new(FrameCache::new(&config.frames_dir, config.total_frames));
    if config.background_policy == ScrollPolicy::Delta {
        let loaded = frames.preload_all().await;
        tracing::info!("Preloaded {}/{} background frames", loaded, frames.total_frames());
    }

    let sessions = Arc::new(SessionRegistry::new(
        config.session_ttl,
        config.max_sessions_per_user,
    ));

    // Sweep idle sessions in the background
    let sweeper = sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweeper.idle_ttl().max(Duration::from_secs(60)) / 4);
        loop {
            interval.tick().await;
            let evicted = sweeper.evict_idle(std::time::Instant::now());
            if evicted > 0 {
                tracing::info!("Evicted {} idle sessions", evicted);
            }
        }
    });

    // Create AppState
    let state = AppState {
        repo: Repository::new(Arc::new(store)),
        catalog: Arc::new(catalog),
        sessions,
        gateway,
        frames,
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start the server
    axum::serve(listener, app).await?;
    Ok(())
}
