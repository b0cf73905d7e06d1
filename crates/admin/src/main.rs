//! WooCommerce back-office server.
//!
//! Serves the JSON back-office API on `APP_HOST:APP_PORT` (default
//! `127.0.0.1:5000`). TLS is terminated by the reverse proxy in front of it.
//!
//! # Startup
//!
//! 1. Load configuration, start Sentry, then tracing
//! 2. Connect the MySQL pool (migrations are run by `wbo-cli migrate`)
//! 3. Re-dispatch order e-mail triggers left pending by a previous run
//! 4. Serve until Ctrl+C or SIGTERM

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::time::Duration;

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use woo_backoffice_admin::config::AppConfig;
use woo_backoffice_admin::error::set_error_details;
use woo_backoffice_admin::middleware::create_session_layer;
use woo_backoffice_admin::state::AppState;
use woo_backoffice_admin::woocommerce::email_trigger::redispatch_stale;
use woo_backoffice_admin::{app, db};

/// Outbox rows younger than this may still be running in another process.
const OUTBOX_GRACE: Duration = Duration::from_secs(5 * 60);
const OUTBOX_REDISPATCH_LIMIT: u32 = 100;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AppConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            send_default_pii: false,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(config: &AppConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "woo_backoffice_admin=info,tower_http=debug".into());

    // JSON lines in production for the log collector, text locally
    let json = config.environment.is_production();
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    // Sentry must be up before the tracing layer that forwards to it
    let _sentry_guard = init_sentry(&config);
    init_tracing(&config);
    set_error_details(config.error_details());

    let pool = db::create_pool(&config.database).await?;
    tracing::info!(database = %config.database.name, "database pool created");

    let session_layer = create_session_layer(&pool, &config)?;
    let addr = config.socket_addr();
    let state = AppState::new(config, pool.clone())?;

    match redispatch_stale(&pool, state.email_trigger(), OUTBOX_GRACE, OUTBOX_REDISPATCH_LIMIT)
        .await
    {
        Ok(0) => {}
        Ok(count) => tracing::info!(count, "stale e-mail triggers re-dispatched"),
        Err(e) => tracing::warn!(error = %e, "failed to read the e-mail outbox"),
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("back-office listening on http://{addr}");

    axum::serve(listener, app(state, session_layer))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
