pub use crate::{
    progress::{
        DEFAULT_WINDOW_SIZE, DelayBaseline, Segment, StopDelay, StopRecord, StopStatus,
        TripProgress, TripSession, Window, compute_trip_progress, format_delta,
        segment_progress, select_window,
    },
    shared::time::{Duration, Time},
    source::{Snapshot, TripLiveDetails},
};
