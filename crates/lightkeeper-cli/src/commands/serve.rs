//! `keeper serve` -- run the HTTP API over the configured backend.

use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use lightkeeper_platform::{Clock, KvStore, MemoryKvStore, SystemClock};
use lightkeeper_services::{ApiState, build_router};
use lightkeeper_types::config::{KeeperConfig, KvBackend};
use tracing::info;

/// Arguments for `keeper serve`.
#[derive(Args)]
pub struct ServeArgs {
    /// Listen address (overrides `server.bind`).
    #[arg(long)]
    pub bind: Option<String>,
}

/// Build the key-value backend named in the config.
async fn open_store(config: &KeeperConfig) -> anyhow::Result<Arc<dyn KvStore>> {
    match config.kv.backend {
        KvBackend::Memory => {
            info!("using in-memory store; state is lost on restart");
            Ok(Arc::new(MemoryKvStore::default()))
        }
        KvBackend::Redis => open_redis(config).await,
    }
}

#[cfg(feature = "redis")]
async fn open_redis(config: &KeeperConfig) -> anyhow::Result<Arc<dyn KvStore>> {
    let url = config
        .kv
        .url
        .as_deref()
        .context("kv.backend is redis but no kv.url is set")?;
    let store = lightkeeper_platform::RedisKvStore::connect(url)
        .await
        .context("failed to connect to redis")?;
    info!("connected to redis");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
async fn open_redis(_config: &KeeperConfig) -> anyhow::Result<Arc<dyn KvStore>> {
    anyhow::bail!("kv.backend is redis but keeper was built without the `redis` feature")
}

/// Run the API until Ctrl+C.
pub async fn run(mut config: KeeperConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    config.validate().context("invalid configuration")?;

    if !config.upload.signing_key.is_configured() && !config.upload.secret.is_configured() {
        tracing::warn!("no upload credentials configured; every upload will be rejected");
    }

    let kv = open_store(&config).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let bind = config.server.bind.clone();

    let router = build_router(ApiState::new(config, kv, clock));
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    info!(addr = %bind, "lightkeeper listening; press Ctrl+C to stop");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("received Ctrl+C, shutting down");
        })
        .await
        .context("server error")?;

    info!("lightkeeper stopped");
    Ok(())
}
