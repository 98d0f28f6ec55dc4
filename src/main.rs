use std::net::SocketAddr;
use std::process::ExitCode;

use content_api::{
    config::{AppConfig, StorageBackend},
    create_router, db, logging, AppState,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_tracing(config.environment);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Content API stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Content API - Starting in {} mode...", config.environment);

    if config.uses_default_secret() {
        tracing::warn!("JWT_SECRET is not set; using the insecure development default");
    }

    let state = match config.storage {
        StorageBackend::Postgres => {
            tracing::info!("Connecting to database...");
            let pool = db::create_pool(&config.database_url).await?;
            db::run_migrations(&pool).await?;
            AppState::postgres(config.clone(), pool)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on exit");
            AppState::in_memory(config.clone())
        }
    };

    // Token bucket per client IP: `max` burst, one request back every window/max seconds
    let replenish_secs = (config.rate_limit_window_secs / config.rate_limit_max.max(1) as u64).max(1);
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(replenish_secs)
        .burst_size(config.rate_limit_max.max(1))
        .finish()
        .ok_or("invalid rate limit configuration")?;

    // 429 budget is a GCRA token bucket, not a fixed window; the config is leaked for the process lifetime
    let app = create_router(state).layer(GovernorLayer {
        config: Box::leak(Box::new(governor_conf)),
    });

    let addr = config.bind_address();
    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Content API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
