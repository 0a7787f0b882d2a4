//! # Pulse API Server
//!
//! Actix-web entry point for the social feed backend.

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

use pulse_core::ports::RateLimiter;

#[cfg(feature = "scheduler")]
mod background;
mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

#[cfg(test)]
mod tests;

use config::AppConfig;
use observability::RequestIdMiddleware;
use state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();
    telemetry::init_telemetry(&config.telemetry);
    config.warn_insecure_defaults();

    tracing::info!(
        service = %config.telemetry.service_name,
        host = %config.host,
        port = config.port,
        "Starting Pulse API server"
    );

    let state = AppState::new(&config).await;
    let limiter = auth_limiter(&config);

    #[cfg(feature = "scheduler")]
    let scheduler = start_scheduler(&config, &state).await;

    let server_state = state.clone();
    let server = HttpServer::new(move || {
        let limiter = limiter.clone();
        App::new()
            .wrap(RequestIdMiddleware)
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(server_state.clone()))
            .configure(|cfg| handlers::configure_routes(cfg, limiter))
    })
    .shutdown_timeout(config.shutdown_timeout().as_secs())
    .bind((config.host.as_str(), config.port))?
    .run();

    let result = server.await;

    #[cfg(feature = "scheduler")]
    stop_scheduler(scheduler).await;

    tracing::info!("Server stopped");
    result
}

#[cfg(feature = "rate-limit")]
fn auth_limiter(config: &AppConfig) -> Option<Arc<dyn RateLimiter>> {
    tracing::info!(
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window.as_secs(),
        "Rate limiting /api/auth"
    );
    Some(Arc::new(pulse_infra::KeyedRateLimiter::new(
        config.rate_limit.clone(),
    )))
}

#[cfg(not(feature = "rate-limit"))]
fn auth_limiter(_config: &AppConfig) -> Option<Arc<dyn RateLimiter>> {
    None
}

/// Start the publication sweep. A scheduler failure is logged and the server
/// keeps running; scheduled posts then stay pending until the next start.
#[cfg(feature = "scheduler")]
async fn start_scheduler(config: &AppConfig, state: &AppState) -> Option<background::Scheduler> {
    use background::{PublicationSweep, Scheduler, register_publication_sweep};

    if !config.scheduler.enabled {
        tracing::info!("Scheduler disabled; scheduled posts will not be published");
        return None;
    }

    let started = async {
        let scheduler = Scheduler::new(config.scheduler.clone()).await?;
        register_publication_sweep(&scheduler, PublicationSweep::new(state.posts.clone())).await?;
        scheduler.start().await?;
        Ok::<_, tokio_cron_scheduler::JobSchedulerError>(scheduler)
    };

    match started.await {
        Ok(scheduler) => Some(scheduler),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start scheduler");
            None
        }
    }
}

#[cfg(feature = "scheduler")]
async fn stop_scheduler(scheduler: Option<background::Scheduler>) {
    if let Some(mut scheduler) = scheduler {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Scheduler did not stop cleanly");
        }
    }
}
