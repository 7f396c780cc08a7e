use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use livetrack::progress::select_window;
use tokio::time::timeout;
use tracing::error;

use crate::{
    dto::{FleetDto, ProgressDto},
    state::AppState,
    tracker::Tracker,
};

const FIRST_UPDATE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn progress(
    Path(fleet_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, StatusCode> {
    let fleet_id = fleet_id.trim().to_lowercase();
    if fleet_id.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let window_size: usize = match params.get("window") {
        Some(value) => value.parse().map_err(|_| StatusCode::BAD_REQUEST)?,
        None => state.config.window_size,
    };

    let mut updates = {
        let mut trackers = state.trackers.write().await;
        let tracker = trackers.entry(fleet_id.clone()).or_insert_with(|| {
            Tracker::spawn(state.feed.clone(), &fleet_id, state.tracker_config())
        });
        tracker.touch();
        tracker.subscribe()
    };

    let update = timeout(FIRST_UPDATE_TIMEOUT, updates.wait_for(|update| update.is_some()))
        .await
        .map_err(|_| {
            error!("No data for fleet {fleet_id} yet");
            StatusCode::GATEWAY_TIMEOUT
        })?
        .map_err(|err| {
            error!("Tracker for fleet {fleet_id} stopped: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .clone()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    let window = select_window(update.stops.len(), update.progress.current_index, window_size);
    Ok(Json(ProgressDto::from(&update, window)).into_response())
}

pub async fn untrack(
    Path(fleet_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    let fleet_id = fleet_id.trim().to_lowercase();
    match state.trackers.write().await.remove(&fleet_id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

pub async fn fleets(State(state): State<Arc<AppState>>) -> Json<Vec<FleetDto>> {
    let trackers = state.trackers.read().await;
    let mut fleets: Vec<_> = trackers
        .values()
        .map(|tracker| FleetDto {
            fleet_id: tracker.fleet_id().to_string(),
            overall_progress: tracker
                .latest()
                .map(|update| update.progress.overall_progress),
        })
        .collect();
    fleets.sort_by(|a, b| a.fleet_id.cmp(&b.fleet_id));
    Json(fleets)
}
