use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use nba_games_dashboard::balldontlie::BallDontLie;
use nba_games_dashboard::cache::{CACHE_TTL, ScheduleCache};
use nba_games_dashboard::config::{self, Config};
use nba_games_dashboard::dashboard::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;
    let api_key = config::api_key_from_env().context("cannot start without an API key")?;

    let client = Arc::new(BallDontLie::new(&config.api_base_url, api_key));
    let cache = Arc::new(ScheduleCache::new(CACHE_TTL));
    let app = dashboard::router(AppState {
        client,
        cache,
        per_page: config.per_page,
    });

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, "dashboard listening");
    axum::serve(listener, app).await?;
    Ok(())
}
