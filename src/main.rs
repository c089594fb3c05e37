mod clients;
mod config;
mod error;
mod llm;
mod net;
mod orchestrator;
mod parser;
mod places;
mod rate_limit;
mod routes;
#[cfg(test)]
mod testing;
mod types;

use std::{net::SocketAddr, sync::Arc};

use config::Config;
use orchestrator::QueryOrchestrator;
use rate_limit::RateLimiter;
use routes::AppState;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    // initialize tracing
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_max,
        config.rate_limit_window,
    ));
    spawn_window_sweeper(limiter.clone(), config.rate_limit_window);

    let orchestrator = QueryOrchestrator::new(
        clients::language_model(&config)?,
        clients::place_provider(&config)?,
        limiter.clone(),
        config.orchestrator_settings(),
    );
    let app = routes::app(AppState {
        orchestrator: Arc::new(orchestrator),
        limiter,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Running on port {}", config.port);

    axum::Server::bind(&addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    Ok(())
}

/// Periodically forgets clients whose window has elapsed.
fn spawn_window_sweeper(limiter: Arc<RateLimiter>, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            limiter.prune();
            debug!(clients = limiter.tracked_clients(), "rate windows swept");
        }
    });
}
