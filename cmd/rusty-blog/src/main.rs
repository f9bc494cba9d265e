//! # rusty-blog
//!
//! Wires the default adapter set (Postgres, Redis, local media, JWT
//! sessions) to the services and serves the axum router.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use secrecy::ExposeSecret;
use tracing::info;

use api_adapters::AppState;
use auth_adapters::JwtSessions;
use domains::BlogRepo;
use services::{EngageService, FeedService, PublishService};
use storage_adapters::{LocalMediaStore, PgRepo, RedisPageCache};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = configs::Settings::load().context("loading configuration")?;
    init_tracing(&settings.log);

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(settings.database.url.expose_secret())
        .await
        .context("connecting to postgres")?;
    let repo = PgRepo::new(pool);
    repo.migrate().await.context("running migrations")?;
    let repo: Arc<dyn BlogRepo> = Arc::new(repo);

    let cache = Arc::new(
        RedisPageCache::connect(&settings.cache.url).context("connecting to redis")?,
    );
    let media_root = PathBuf::from(&settings.media.root);
    let media = Arc::new(LocalMediaStore::new(
        media_root.clone(),
        settings.media.url_prefix.clone(),
    ));
    let sessions = Arc::new(JwtSessions::new(
        settings.auth.jwt_secret.expose_secret().as_bytes(),
        settings.auth.session_ttl_hours,
    ));

    let state = AppState {
        feed: Arc::new(FeedService::new(repo.clone())),
        publish: Arc::new(PublishService::new(repo.clone(), media.clone())),
        engage: Arc::new(EngageService::new(repo.clone())),
        repo,
        cache,
        media,
        sessions,
        metrics: Arc::new(api_adapters::metrics::Metrics::new()),
        cache_ttl: Duration::from_secs(settings.cache.ttl_seconds),
    };

    let app = api_adapters::router(state, Some(media_root));
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "rusty-blog listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

fn init_tracing(log: &configs::Log) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to install ctrl-c handler");
        return;
    }
    info!("shutdown signal received");
}
