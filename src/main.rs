use chrono::Utc;
use rusty_library_api::{
    adapters::{memory, postgres},
    api::{handlers::AppState, router::create_router},
    application::{ServiceDependencies, loan},
    config::{AppConfig, LogFormat, StorageBackend},
};
use std::{sync::Arc, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rusty_library_api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

async fn build_dependencies(config: &AppConfig) -> Result<ServiceDependencies, BoxError> {
    let loan_policy = config.loan_policy();

    match config.storage {
        StorageBackend::Postgres => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(&config.database.url)
                .await?;

            if config.database.run_migrations {
                sqlx::migrate!("./migrations").run(&pool).await?;
                tracing::info!("Database migrations applied");
            }

            Ok(postgres::service_dependencies(pool, loan_policy))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            Ok(memory::service_dependencies(
                Arc::new(memory::InMemoryLibrary::new()),
                loan_policy,
            ))
        }
    }
}

/// 一定間隔で期限切れの貸出をOverdueに更新する
fn spawn_overdue_sweep(deps: ServiceDependencies, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match loan::mark_overdue(&deps, Utc::now()).await {
                Ok(0) => tracing::debug!("Overdue sweep: nothing to mark"),
                Ok(count) => tracing::info!(count, "Overdue sweep marked loans"),
                Err(e) => tracing::warn!(error = %e, "Overdue sweep failed"),
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(config.logging.format);

    tracing::info!(storage = ?config.storage, "Starting library API");

    let service_deps = build_dependencies(&config).await?;

    let sweep = config
        .loan_policy
        .sweep_interval_secs
        .map(|secs| spawn_overdue_sweep(service_deps.clone(), Duration::from_secs(secs)));

    let app_state = Arc::new(AppState { service_deps });
    let app = create_router(app_state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = sweep {
        handle.abort();
    }
    Ok(())
}
