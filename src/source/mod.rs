use std::{
    collections::HashSet,
    fs::File,
    io::{self, Read},
    path::Path,
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

mod config;
pub use config::*;

use crate::progress::StopRecord;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Stop number {0} appears more than once")]
    DuplicateStopNumber(String),
}

/// Payload published by the live trip scraper for one vehicle.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripLiveDetails {
    pub route_number: Option<String>,
    pub associated_fleet_number: Option<String>,
    pub service_alert: Option<String>,
    pub stops: Vec<StopRecord>,
}

impl TripLiveDetails {
    /// Checks that every stop number is unique within the trip.
    pub fn validate(&self) -> Result<(), self::Error> {
        check_unique(&self.stops)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRow {
    stop_name: Option<String>,
    stop_number: Option<String>,
    time: Option<String>,
    status: Option<String>,
}

impl SnapshotRow {
    fn into_record(self) -> Option<StopRecord> {
        let stop_name = non_empty(self.stop_name)?;
        let stop_number = non_empty(self.stop_number)?;
        let time = non_empty(self.time)?;
        let status = self.status.unwrap_or_default();
        Some(StopRecord::new(stop_name, stop_number, time, status.trim()))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// A recorded stop list, kept in file order.
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    config: Config,
}

impl Snapshot {
    pub fn new(config: self::Config) -> Self {
        Self { config }
    }

    pub fn from_csv<P: AsRef<Path>>(&self, path: P) -> Result<Arc<[StopRecord]>, self::Error> {
        let file = File::open(path)?;
        self.from_reader(file)
    }

    /// Rows without a name, number or time are skipped.
    pub fn from_reader<R: Read>(&self, reader: R) -> Result<Arc<[StopRecord]>, self::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.config.delimiter)
            .has_headers(self.config.has_headers)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut stops = Vec::new();
        for row in reader.deserialize::<SnapshotRow>() {
            match row?.into_record() {
                Some(stop) => stops.push(stop),
                None => debug!("Skipping incomplete snapshot row"),
            }
        }
        check_unique(&stops)?;
        Ok(stops.into())
    }
}

fn check_unique(stops: &[StopRecord]) -> Result<(), self::Error> {
    let mut seen = HashSet::with_capacity(stops.len());
    for stop in stops {
        if !seen.insert(stop.stop_number.clone()) {
            return Err(self::Error::DuplicateStopNumber(stop.stop_number.to_string()));
        }
    }
    Ok(())
}
