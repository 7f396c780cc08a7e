use std::{fmt::Display, sync::Arc};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::shared::time::Time;

/// Live status tag scraped next to each stop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopStatus {
    /// The vehicle has left this stop.
    Departed,
    /// The time shown is an estimate.
    Predicted,
    /// The vehicle is standing at this stop.
    Arrived,
    /// Anything else the page reports (cancelled, skipped, blank, ...).
    #[default]
    Unknown,
}

impl StopStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StopStatus::Departed => "Departed",
            StopStatus::Predicted => "Predicted",
            StopStatus::Arrived => "Arrived",
            StopStatus::Unknown => "Unknown",
        }
    }

    /// The vehicle has reached or passed this stop.
    pub const fn is_reached(&self) -> bool {
        matches!(self, StopStatus::Arrived | StopStatus::Departed)
    }

    /// A segment may start animating from a stop with this status.
    pub const fn can_depart(&self) -> bool {
        matches!(self, StopStatus::Departed | StopStatus::Predicted)
    }
}

impl From<&str> for StopStatus {
    fn from(value: &str) -> Self {
        match value {
            "Departed" => StopStatus::Departed,
            "Predicted" => StopStatus::Predicted,
            "Arrived" => StopStatus::Arrived,
            _ => StopStatus::Unknown,
        }
    }
}

impl Display for StopStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StopStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StopStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(StopStatus::from(value.as_str()))
    }
}

/// One row of a live trip, in route order.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRecord {
    pub stop_name: Arc<str>,
    /// Unique within a trip, stable between polls.
    pub stop_number: Arc<str>,
    /// Scheduled, predicted or actual time, as shown on the page.
    pub time: Arc<str>,
    pub status: StopStatus,
}

impl StopRecord {
    pub fn new(
        stop_name: impl Into<Arc<str>>,
        stop_number: impl Into<Arc<str>>,
        time: impl Into<Arc<str>>,
        status: impl Into<StopStatus>,
    ) -> Self {
        Self {
            stop_name: stop_name.into(),
            stop_number: stop_number.into(),
            time: time.into(),
            status: status.into(),
        }
    }

    pub fn parsed_time(&self) -> Option<Time> {
        Time::parse(&self.time)
    }

    /// Still predicted although the predicted time has already passed.
    pub fn is_overdue(&self, now: Time) -> bool {
        self.status == StopStatus::Predicted && self.parsed_time().is_some_and(|time| now > time)
    }
}
