use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    progress::{Segment, StopRecord, format_delta, segment_progress},
    shared::time::Time,
};

/// Snapshot of a trip's progress at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripProgress {
    /// Last stop the vehicle is confirmed to have reached or passed.
    pub current_index: Option<usize>,
    pub current_stop: Option<StopRecord>,
    pub next_stop: Option<StopRecord>,
    /// One entry per adjacent stop pair, `segments[i]` spans stop `i` to `i + 1`.
    pub segments: Vec<Segment>,
    pub overall_progress: f64,
    /// Clock reading this snapshot was computed at.
    pub now: Time,
}

impl TripProgress {
    fn empty(now: Time) -> Self {
        Self {
            current_index: None,
            current_stop: None,
            next_stop: None,
            segments: Vec::new(),
            overall_progress: 0.0,
            now,
        }
    }

    /// Ratio for any segment, `0.0` when `idx` is out of range.
    pub fn segment_progress(&self, idx: usize) -> f64 {
        self.segments.get(idx).map_or(0.0, |segment| segment.progress)
    }

    /// Fractional progress of the segment leaving the current stop.
    pub fn active_progress(&self) -> f64 {
        self.current_index
            .map_or(0.0, |current| self.segment_progress(current))
    }

    pub fn is_complete(&self) -> bool {
        !self.segments.is_empty() && self.current_index == Some(self.segments.len())
    }

    /// Relative label for a stop's time, as seen from this snapshot.
    pub fn format_stop_delta(&self, stop: &StopRecord) -> Option<String> {
        stop.parsed_time().map(|time| format_delta(time, self.now))
    }
}

/// Index of the last stop flagged as arrived or departed.
pub fn infer_current_index(stops: &[StopRecord]) -> Option<usize> {
    stops.iter().rposition(|stop| stop.status.is_reached())
}

/// Computes the progress of a trip from scratch.
///
/// `current_stop_hint` is a stop number known from elsewhere; when given it
/// replaces the status based inference, even if it matches no stop.
/// Stops are taken in route order and never re-sorted.
pub fn compute_trip_progress(
    stops: &[StopRecord],
    now: Time,
    current_stop_hint: Option<&str>,
) -> TripProgress {
    if stops.is_empty() {
        return TripProgress::empty(now);
    }

    let current_index = match current_stop_hint {
        Some(hint) => {
            let index = stops.iter().position(|stop| &*stop.stop_number == hint);
            if index.is_none() {
                warn!("Current stop {hint} is not part of the trip");
            }
            index
        }
        None => infer_current_index(stops),
    };

    let segments: Vec<Segment> = stops
        .windows(2)
        .enumerate()
        .map(|(i, pair)| match current_index {
            Some(current) if i < current => Segment::COMPLETE,
            Some(current) if i == current => segment_progress(&pair[0], &pair[1], now),
            _ => Segment::NOT_STARTED,
        })
        .collect();

    let overall_progress = if segments.is_empty() {
        0.0
    } else {
        let completed = current_index.unwrap_or(0).min(segments.len()) as f64;
        let active = current_index
            .and_then(|current| segments.get(current))
            .map_or(0.0, |segment| segment.progress);
        ((completed + active) / segments.len() as f64).clamp(0.0, 1.0)
    };

    let current_stop = current_index.map(|current| stops[current].clone());
    let next_stop = match current_index {
        Some(current) => stops.get(current + 1).cloned(),
        None => stops.first().cloned(),
    };

    debug!(
        "Trip progress at {now}: current {:?}, overall {:.3}",
        current_index, overall_progress
    );

    TripProgress {
        current_index,
        current_stop,
        next_stop,
        segments,
        overall_progress,
        now,
    }
}
