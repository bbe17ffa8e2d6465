use std::sync::Arc;

use anyhow::Context;

use farmlink_infra::{InMemoryMarketStore, MarketStore, PostgresMarketStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    farmlink_observability::init();

    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });

    let store: Arc<dyn MarketStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = PostgresMarketStore::connect(&url)
                .await
                .context("failed to connect to Postgres")?;
            tracing::info!("using the Postgres store");
            Arc::new(store)
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; state lives in memory only");
            Arc::new(InMemoryMarketStore::new())
        }
    };

    let app = farmlink_api::app::build_app(jwt_secret, store);

    let addr = std::env::var("FARMLINK_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
