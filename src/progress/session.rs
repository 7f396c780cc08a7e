use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    progress::{DelayBaseline, StopRecord, TripProgress, compute_trip_progress},
    shared::time::Time,
};

/// Per-trip state carried between polls: the last stop list and the delay
/// baseline. Everything else is recomputed from scratch.
#[derive(Debug, Clone)]
pub struct TripSession {
    trip_id: Arc<str>,
    stops: Arc<[StopRecord]>,
    current_stop_hint: Option<Arc<str>>,
    baseline: DelayBaseline,
}

impl TripSession {
    pub fn new(trip_id: impl Into<Arc<str>>) -> Self {
        Self {
            trip_id: trip_id.into(),
            stops: Arc::new([]),
            current_stop_hint: None,
            baseline: DelayBaseline::new(),
        }
    }

    pub fn trip_id(&self) -> &str {
        &self.trip_id
    }

    pub fn stops(&self) -> &[StopRecord] {
        &self.stops
    }

    pub fn shared_stops(&self) -> Arc<[StopRecord]> {
        self.stops.clone()
    }

    pub fn baseline(&self) -> &DelayBaseline {
        &self.baseline
    }

    /// Switches to another trip, dropping everything learned about the old one.
    /// Returns `true` if the trip changed.
    pub fn retarget(&mut self, trip_id: &str) -> bool {
        if &*self.trip_id == trip_id {
            return false;
        }
        info!("Switching trip {} -> {}", self.trip_id, trip_id);
        *self = Self::new(trip_id);
        true
    }

    /// Replaces the stop list with a fresher one.
    pub fn update(&mut self, stops: impl Into<Arc<[StopRecord]>>) {
        let stops = stops.into();
        self.baseline.observe(&stops);
        debug!(
            "Trip {} updated with {} stops, {} baselines",
            self.trip_id,
            stops.len(),
            self.baseline.len()
        );
        self.stops = stops;
    }

    /// Pins the current stop instead of inferring it from statuses.
    pub fn set_current_stop_hint(&mut self, stop_number: Option<&str>) {
        self.current_stop_hint = stop_number.map(Arc::from);
    }

    pub fn compute(&self, now: Time) -> TripProgress {
        compute_trip_progress(&self.stops, now, self.current_stop_hint.as_deref())
    }

    /// Drift of the stop the vehicle is heading to, or of the last stop once
    /// the trip is complete.
    pub fn delay_minutes(&self, progress: &TripProgress) -> Option<i32> {
        progress
            .next_stop
            .as_ref()
            .or(progress.current_stop.as_ref())
            .and_then(|stop| self.baseline.delay_minutes(stop))
    }
}
