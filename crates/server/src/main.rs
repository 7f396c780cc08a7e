mod api;
mod config;
mod dto;
mod feed;
mod state;
mod tracker;

use crate::{config::Config, state::AppState};
use axum::routing::get;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    info!("Starting server...");
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    };
    let port = config.port;
    info!(
        "Polling {} every {:?}, recomputing every {:?}, idle after {:?}",
        config.upstream_url, config.poll_interval, config.tick_interval, config.idle_timeout
    );
    let state = Arc::new(AppState::new(config));

    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut sweep = tokio::time::interval(sweeper.config.poll_interval);
        loop {
            sweep.tick().await;
            sweeper.evict_idle().await;
        }
    });

    let app = axum::Router::new()
        .route("/fleets", get(api::fleets))
        .route("/fleet/{fleet_id}", axum::routing::delete(api::untrack))
        .route("/fleet/{fleet_id}/progress", get(api::progress))
        .with_state(state);
    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind port {port}: {err}");
            std::process::exit(1);
        }
    };
    info!("Listening to port {port}");
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server stopped: {err}");
    }
}
