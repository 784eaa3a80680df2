use anyhow::Context;
use sns_backend::{app, db, AppConfig, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!(error = ?e, "fatal error");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // A missing .env is fine; the process environment still applies.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sns_backend=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(environment = ?config.environment, "starting sns backend");
    tracing::debug!(config = %serde_json::to_string(&config)?, "effective configuration");

    let pool = db::connect_to_db(&config.database).await?;
    let bind_addr = config.bind_addr();
    let app = app(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("listening on http://{}/graphql/", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
