use livetrack::progress::{Segment, StopRecord, StopStatus, Window};
use serde::Serialize;

use crate::tracker::TripUpdate;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopDto {
    pub index: usize,
    pub stop_name: String,
    pub stop_number: String,
    pub time: String,
    pub status: String,
    /// Relative label, or "Delayed" once a prediction has passed.
    pub eta: Option<String>,
    pub delay_minutes: Option<i32>,
    pub in_window: bool,
}

impl StopDto {
    pub fn from(index: usize, stop: &StopRecord, update: &TripUpdate, window: &Window) -> Self {
        let now = update.progress.now;
        let eta = if stop.status == StopStatus::Unknown {
            None
        } else if stop.is_overdue(now) {
            Some("Delayed".to_string())
        } else {
            update.progress.format_stop_delta(stop)
        };
        Self {
            index,
            stop_name: stop.stop_name.to_string(),
            stop_number: stop.stop_number.to_string(),
            time: stop.time.to_string(),
            status: stop.status.to_string(),
            eta,
            delay_minutes: update.stop_delay(index),
            in_window: window.contains(index),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowDto {
    pub indices: Vec<usize>,
    pub local_progress: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDto {
    pub fleet_id: String,
    pub route_number: Option<String>,
    pub service_alert: Option<String>,
    pub now: String,
    /// `-1` while the vehicle's position is unknown.
    pub current_index: i64,
    pub overall_progress: f64,
    pub delay_minutes: Option<i32>,
    pub window: WindowDto,
    pub stops: Vec<StopDto>,
    pub segments: Vec<Segment>,
}

impl ProgressDto {
    pub fn from(update: &TripUpdate, window: Window) -> Self {
        let progress = &update.progress;
        let stops = update
            .stops
            .iter()
            .enumerate()
            .map(|(index, stop)| StopDto::from(index, stop, update, &window))
            .collect();
        Self {
            fleet_id: update.fleet_id.to_string(),
            route_number: update.route_number.clone(),
            service_alert: update.service_alert.clone(),
            now: progress.now.to_hms_string(),
            current_index: progress.current_index.map_or(-1, |index| index as i64),
            overall_progress: progress.overall_progress,
            delay_minutes: update.delay_minutes,
            window: WindowDto {
                indices: window.indices(),
                local_progress: window.local_progress(progress),
            },
            stops,
            segments: progress.segments.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetDto {
    pub fleet_id: String,
    pub overall_progress: Option<f64>,
}
