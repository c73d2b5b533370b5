//! # Quill API Server
//!
//! actix-web front of the blog: posts, categories and author accounts.

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

use quill_core::ports::{PasswordService, RateLimiter, TokenService};
use quill_infra::{Argon2PasswordService, JwtTokenService};

mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

use config::AppConfig;
use observability::RequestIdMiddleware;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();
    tracing::info!(host = %config.host, port = config.port, "Starting Quill API server");

    let state = AppState::new(config.database.as_ref()).await;
    let token_service: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(config.jwt.clone()));
    let password_service: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());
    let rate_limiter = build_rate_limiter(&config);

    HttpServer::new(move || {
        let mut app = App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(token_service.clone()))
            .app_data(web::Data::new(password_service.clone()));
        if let Some(limiter) = &rate_limiter {
            app = app.app_data(web::Data::new(limiter.clone()));
        }

        app.wrap(TracingLogger::default())
            .wrap(RequestIdMiddleware)
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

#[cfg(feature = "rate-limit")]
fn build_rate_limiter(config: &AppConfig) -> Option<Arc<dyn RateLimiter>> {
    match quill_infra::InMemoryRateLimiter::new(config.rate_limit.clone()) {
        Ok(limiter) => {
            tracing::info!(
                max_requests = config.rate_limit.max_requests,
                window_secs = config.rate_limit.window.as_secs(),
                "Rate limiting /api/auth"
            );
            Some(Arc::new(limiter))
        }
        Err(e) => {
            tracing::error!(error = %e, "Invalid rate limit settings, /api/auth is unlimited");
            None
        }
    }
}

#[cfg(not(feature = "rate-limit"))]
fn build_rate_limiter(_config: &AppConfig) -> Option<Arc<dyn RateLimiter>> {
    None
}
