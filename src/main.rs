// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relational_pki_gateway::api::router;
use relational_pki_gateway::auth::ProxyPkiVerifier;
use relational_pki_gateway::cache::{
    AccessCache, AccessChecker, CacheRefresher, HttpAccessProvider,
};
use relational_pki_gateway::config::Config;
use relational_pki_gateway::state::AppState;

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    if config.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    // Configuration problems abort startup; nothing is deferred to request
    // time.
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Configuration error: {error}");
            std::process::exit(1);
        }
    };
    init_tracing(&config);

    let cache = Arc::new(
        AccessCache::open(&config.data_dir.join("access_cache.redb"))
            .expect("Failed to open access cache database"),
    );
    let provider = Arc::new(HttpAccessProvider::new(config.access_checker_url.clone()));
    let checker = Arc::new(AccessChecker::new(cache.clone(), provider));

    let strategy = ProxyPkiVerifier::new(checker.clone(), config.session_max_age)
        .into_strategy([
            config.primary_user_header.as_str(),
            config.proxied_user_header.as_str(),
            config.masquerade_user_header.as_str(),
        ])
        .expect("Invalid trusted header configuration");

    let state = AppState {
        cache,
        checker: checker.clone(),
        strategy: Arc::new(strategy),
        config: Arc::new(config.clone()),
    };

    // Background refresh runs independently of request handling.
    let shutdown = CancellationToken::new();
    let refresher = CacheRefresher::new(checker, config.refresh_interval, config.refresh_window);
    tokio::spawn(refresher.run(shutdown.clone()));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Failed to parse bind address");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");

    info!(%addr, "Relational PKI gateway listening (docs at /docs)");

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutdown signal received");
                shutdown.cancel();
            }
        })
        .await
        .expect("HTTP server failed");
}
