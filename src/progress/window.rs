use std::ops::Range;

use serde::Serialize;

use crate::progress::TripProgress;

pub const DEFAULT_WINDOW_SIZE: usize = 3;

/// Contiguous run of stop indices picked for a condensed view.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: usize,
    /// Exclusive.
    pub end: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.range().contains(&idx)
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn indices(&self) -> Vec<usize> {
        self.range().collect()
    }

    /// Number of segments between the first and last stop of the window.
    pub fn segment_count(&self) -> usize {
        self.len().saturating_sub(1)
    }

    /// Progress across the window only: completed segments inside it plus
    /// the active segment's fraction, over the segments it spans.
    /// Falls back to the trip-wide figure when the window spans no segment.
    pub fn local_progress(&self, progress: &TripProgress) -> f64 {
        let segment_count = self.segment_count();
        if segment_count == 0 {
            return progress.overall_progress;
        }
        let Some(current) = progress.current_index else {
            return 0.0;
        };

        let segments = self.start..self.start + segment_count;
        let completed = segments.clone().filter(|&i| i < current).count() as f64;
        let active = if segments.contains(&current) {
            progress.segment_progress(current)
        } else {
            0.0
        };
        ((completed + active) / segment_count as f64).clamp(0.0, 1.0)
    }
}

/// Picks up to `size` stops around `current`, shifting the window at the
/// route ends so it stays full.
///
/// With no current stop the window is anchored at the first stop.
pub fn select_window(stop_count: usize, current: Option<usize>, size: usize) -> Window {
    if stop_count <= size {
        return Window {
            start: 0,
            end: stop_count,
        };
    }
    if size == 0 {
        return Window::default();
    }

    // Seed with the current stop and its direct neighbours.
    let current = current.map(|current| current.min(stop_count - 1));
    let (mut start, mut end) = match current {
        Some(current) => (current.saturating_sub(1), (current + 2).min(stop_count)),
        None => (0, 1),
    };
    // Windows smaller than the seed keep the current stop.
    while end - start > size {
        if current.is_some_and(|current| end - 1 > current) {
            end -= 1;
        } else {
            start += 1;
        }
    }

    while end - start < size {
        if start > 0 {
            start -= 1;
        } else if end < stop_count {
            end += 1;
        } else {
            break;
        }
    }

    Window { start, end }
}
