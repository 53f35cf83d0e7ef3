//! Storefront Catalog - category tree and product catalog service

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_catalog::config::{Settings, StoreBackend};
use storefront_catalog::domain::CategoryTreeBuilder;
use storefront_catalog::http::{router, AppState};
use storefront_catalog::store::{CatalogStore, InMemoryStore, JsonFileStore, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let settings = Settings::from_env()?;

    let store: Arc<dyn CatalogStore> = match &settings.store {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory catalog store; changes are lost on restart");
            Arc::new(InMemoryStore::default())
        }
        StoreBackend::JsonDir(dir) => Arc::new(JsonFileStore::new(dir.clone())),
        StoreBackend::Postgres { url } => Arc::new(PgStore::connect(url).await?),
    };

    let nats = match &settings.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => { tracing::warn!(error = %e, "NATS unavailable, category events will not be published"); None }
        },
        None => None,
    };

    let builder = CategoryTreeBuilder::new(settings.orphan_policy);
    let state = AppState::new(store, builder, settings.max_levels).with_nats(nats);
    let app = router(state);

    tracing::info!(orphan_policy = ?settings.orphan_policy, max_levels = settings.max_levels.value(), "🚀 Storefront Catalog listening on 0.0.0.0:{}", settings.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", settings.port)).await?, app).await?;
    Ok(())
}
