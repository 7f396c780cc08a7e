use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    progress::{StopRecord, StopStatus},
    shared::time::Time,
};

/// Progress along the stretch between two consecutive stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// 0.0 not started, 1.0 complete.
    pub progress: f64,
    /// Complete by clock only: the predicted arrival has passed unconfirmed.
    pub delayed: bool,
}

impl Segment {
    pub const NOT_STARTED: Segment = Segment {
        progress: 0.0,
        delayed: false,
    };

    pub const COMPLETE: Segment = Segment {
        progress: 1.0,
        delayed: false,
    };

    pub const OVERDUE: Segment = Segment {
        progress: 1.0,
        delayed: true,
    };
}

/// Time-based progress from `start` to `end`.
///
/// The segment only moves while `start` is departed or predicted and `end`
/// still carries a prediction. Progress never passes the end of the segment:
/// once the predicted arrival time is behind us the segment is reported as
/// complete and delayed until the next poll confirms the arrival.
pub fn segment_progress(start: &StopRecord, end: &StopRecord, now: Time) -> Segment {
    let (Some(start_time), Some(end_time)) = (start.parsed_time(), end.parsed_time()) else {
        warn!(
            "Unparseable times for segment {} -> {}",
            start.stop_number, end.stop_number
        );
        return Segment::NOT_STARTED;
    };
    if end_time <= start_time || now < start_time {
        return Segment::NOT_STARTED;
    }

    if !start.status.can_depart() || end.status != StopStatus::Predicted {
        return Segment::NOT_STARTED;
    }

    if now >= end_time {
        return Segment::OVERDUE;
    }

    let elapsed = (now - start_time).as_seconds() as f64;
    let duration = (end_time - start_time).as_seconds() as f64;
    Segment {
        progress: (elapsed / duration).clamp(0.0, 1.0),
        delayed: false,
    }
}
