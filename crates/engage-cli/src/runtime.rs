//! Wiring from [`AppConfig`] to a ready [`Engine`].

use std::sync::Arc;

use engage_core::{AppConfig, EngagementStore};
use engage_db::{PgStore, PoolConfig};
use engage_dispatch::RewardDispatcher;
use engage_engine::{Engine, EngineOptions};
use engage_upstream::UpstreamClient;
use engage_vault::CredentialVault;
use sqlx::PgPool;

/// Connects the pool and applies pending migrations.
pub(crate) async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool_config = PoolConfig::from_app_config(config);
    let pool = engage_db::connect_pool(&config.database_url, pool_config).await?;
    engage_db::run_migrations(&pool).await?;
    Ok(pool)
}

pub(crate) fn load_vault(config: &AppConfig) -> anyhow::Result<Option<Arc<CredentialVault>>> {
    let Some(key) = config.vault_private_key.as_deref() else {
        tracing::warn!("ENGAGE_VAULT_PRIVATE_KEY not set; only plaintext credentials can be used");
        return Ok(None);
    };
    Ok(Some(Arc::new(CredentialVault::from_base64(key)?)))
}

pub(crate) fn build_engine(
    config: &AppConfig,
    pool: PgPool,
    dry_run: bool,
) -> anyhow::Result<Engine> {
    let store: Arc<dyn EngagementStore> = Arc::new(PgStore::new(pool));
    let upstream = UpstreamClient::with_base_url(
        config.upstream_timeout_secs,
        config.upstream_page_size,
        &config.upstream_base_url,
    )?;
    let dispatcher = RewardDispatcher::from_config(config)?;
    let options = EngineOptions {
        dry_run,
        ..EngineOptions::from_config(config)
    };

    Ok(Engine::new(
        store,
        load_vault(config)?,
        upstream,
        dispatcher,
        options,
    ))
}
