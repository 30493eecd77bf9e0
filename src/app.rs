/*
 * Responsibility
 * - Config 読み込み → security policy 構築 → 依存生成 → Router 組み立て
 * - Middleware の適用 (access policy / CORS / HTTP)
 * - SIGHUP で security policy を再読み込み (スナップショットを丸ごと差し替え)
 * - axum::serve() で起動、Ctrl-C / SIGTERM で graceful shutdown
 */
use std::path::{Path, PathBuf};
use std::{panic, process};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::{Config, CorsPolicy, SecurityProperties};
use crate::middleware;
use crate::middleware::http::HttpLimits;
use crate::services::auth::build_verifier;
use crate::services::policy::{PolicyHandle, PolicyStore};
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,gateway_guard=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panic via tracing so they don't get "lost"
        tracing::error!(?info, "panic");

        // Development: crash the whole process so we notice immediately.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    let abort_on_panic = !config.app_env.is_production();
    init_panic_hook(abort_on_panic);

    tracing::info!(
        "starting gateway in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    // An invalid policy file must stop startup, never degrade per request.
    let props = SecurityProperties::load(&config.security_config_path)?;
    let store = PolicyStore::from_properties(&props).with_context(|| {
        format!(
            "invalid security policy in {}",
            config.security_config_path.display()
        )
    })?;
    log_policy(&store, &config.security_config_path);

    let policy = PolicyHandle::new(store);
    let verifier = build_verifier(&config)?;
    let state = AppState::new(policy.clone(), verifier);

    #[cfg(unix)]
    spawn_reload_on_sighup(policy, config.security_config_path.clone());

    let app = build_router(state, &config.http, &props.cors);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn build_router(state: AppState, limits: &HttpLimits, cors: &CorsPolicy) -> Router {
    let router = api::routes();
    let router = middleware::auth::access::apply(router, state.clone()).with_state(state);
    // CORS sits outside the access check so preflights and 401/403 responses carry its headers.
    let router = middleware::cors::apply(router, cors);
    middleware::http::apply(router, limits)
}

fn log_policy(store: &PolicyStore, path: &Path) {
    tracing::info!(
        path = %path.display(),
        permit_all = store.permit_all().len(),
        routes = store.routes().len(),
        "security policy loaded"
    );
    for pattern in store.permit_all() {
        tracing::debug!(pattern = pattern.as_str(), "permit-all path");
    }
    for (order, route) in store.routes().iter().enumerate() {
        tracing::debug!(
            order,
            pattern = route.pattern().as_str(),
            roles = ?route.roles(),
            "role-based route"
        );
    }
}

/// Build a new store from `path` and swap it in. On error the current snapshot stays.
///
/// The CORS section is read at startup only.
pub fn reload_policy(handle: &PolicyHandle, path: &Path) -> Result<()> {
    let props = SecurityProperties::load(path)?;
    let store = PolicyStore::from_properties(&props)
        .with_context(|| format!("invalid security policy in {}", path.display()))?;
    log_policy(&store, path);
    handle.replace(store);
    Ok(())
}

#[cfg(unix)]
fn spawn_reload_on_sighup(handle: PolicyHandle, path: PathBuf) {
    use tokio::signal::unix::{SignalKind, signal};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(error = %err, "SIGHUP handler unavailable; policy reload disabled");
                return;
            }
        };

        while hangup.recv().await.is_some() {
            tracing::info!(path = %path.display(), "SIGHUP received; reloading security policy");
            if let Err(err) = reload_policy(&handle, &path) {
                tracing::error!(error = ?err, "policy reload failed; keeping previous policy");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
