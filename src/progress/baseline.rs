use std::{collections::HashMap, sync::Arc};

use serde::Serialize;

use crate::{
    progress::{StopRecord, StopStatus},
    shared::time::{Duration, Time},
};

/// How far a stop's prediction has moved since it was first seen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopDelay {
    pub index: usize,
    pub stop_number: Arc<str>,
    pub first_seen: Time,
    pub latest: Time,
    pub minutes: i32,
}

/// First predicted time observed for each stop number.
///
/// Entries are written once and never updated, so the drift of a stop is
/// always measured against the earliest prediction seen for it.
#[derive(Debug, Default, Clone)]
pub struct DelayBaseline {
    first_seen: HashMap<Arc<str>, Time>,
}

impl DelayBaseline {
    pub fn new() -> Self {
        Default::default()
    }

    /// Records predictions for stops not seen before.
    pub fn observe(&mut self, stops: &[StopRecord]) {
        for stop in stops.iter().filter(|stop| stop.status == StopStatus::Predicted) {
            if self.first_seen.contains_key(&stop.stop_number) {
                continue;
            }
            if let Some(time) = stop.parsed_time() {
                self.first_seen.insert(stop.stop_number.clone(), time);
            }
        }
    }

    pub fn first_seen(&self, stop_number: &str) -> Option<Time> {
        self.first_seen.get(stop_number).copied()
    }

    /// Current time of `stop` minus its baseline, positive when running late.
    pub fn drift(&self, stop: &StopRecord) -> Option<Duration> {
        let first_seen = self.first_seen(&stop.stop_number)?;
        let latest = stop.parsed_time()?;
        Some(latest - first_seen)
    }

    pub fn delay_minutes(&self, stop: &StopRecord) -> Option<i32> {
        self.drift(stop).map(|drift| drift.as_minutes())
    }

    /// Stops running at least a minute behind their first prediction.
    pub fn stops_with_delay(&self, stops: &[StopRecord]) -> Vec<StopDelay> {
        stops
            .iter()
            .enumerate()
            .filter_map(|(index, stop)| {
                let first_seen = self.first_seen(&stop.stop_number)?;
                let latest = stop.parsed_time()?;
                let minutes = (latest - first_seen).as_minutes();
                (minutes >= 1).then(|| StopDelay {
                    index,
                    stop_number: stop.stop_number.clone(),
                    first_seen,
                    latest,
                    minutes,
                })
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.first_seen.clear();
    }

    pub fn len(&self) -> usize {
        self.first_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_seen.is_empty()
    }
}
