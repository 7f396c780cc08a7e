use std::{env, time::Duration};

use livetrack::progress::DEFAULT_WINDOW_SIZE;
use thiserror::Error;

pub const FLEET_PLACEHOLDER: &str = "{fleet}";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing upstream url, pass it as the first argument or set LIVETRACK_UPSTREAM")]
    MissingUpstream,
    #[error("Upstream url {0} has no {{fleet}} placeholder")]
    MissingPlaceholder(String),
    #[error("{name} must be a positive number, got {value}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Live trip endpoint, `{fleet}` is replaced by the fleet number.
    pub upstream_url: String,
    /// How often fresh stops are fetched.
    pub poll_interval: Duration,
    /// How often progress is recomputed from the last stops.
    pub tick_interval: Duration,
    pub window_size: usize,
    /// Trackers nobody asked about for this long are stopped.
    pub idle_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            upstream_url: String::new(),
            poll_interval: Duration::from_secs(10),
            tick_interval: Duration::from_secs(2),
            window_size: DEFAULT_WINDOW_SIZE,
            idle_timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Reads `LIVETRACK_*` variables, the first CLI argument overrides the
    /// upstream url.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        let upstream = env::args()
            .nth(1)
            .or_else(|| env::var("LIVETRACK_UPSTREAM").ok())
            .ok_or(ConfigError::MissingUpstream)?;
        if !upstream.contains(FLEET_PLACEHOLDER) {
            return Err(ConfigError::MissingPlaceholder(upstream));
        }
        config.upstream_url = upstream;

        if let Some(port) = read_number("LIVETRACK_PORT")? {
            config.port = port as u16;
        }
        if let Some(secs) = read_number("LIVETRACK_POLL_SECS")? {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = read_number("LIVETRACK_TICK_SECS")? {
            config.tick_interval = Duration::from_secs(secs);
        }
        if let Some(size) = read_number("LIVETRACK_WINDOW")? {
            config.window_size = size as usize;
        }
        if let Some(secs) = read_number("LIVETRACK_IDLE_SECS")? {
            config.idle_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

fn read_number(name: &'static str) -> Result<Option<u64>, ConfigError> {
    let Ok(value) = env::var(name) else {
        return Ok(None);
    };
    match value.parse::<u64>() {
        Ok(number) if number > 0 && (name != "LIVETRACK_PORT" || number <= u16::MAX as u64) => {
            Ok(Some(number))
        }
        _ => Err(ConfigError::InvalidNumber { name, value }),
    }
}
