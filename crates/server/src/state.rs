use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::info;

use crate::{
    config::Config,
    feed::HttpFeed,
    tracker::{Tracker, TrackerConfig, evict_idle},
};

pub struct AppState {
    pub config: Config,
    pub feed: Arc<HttpFeed>,
    pub trackers: RwLock<HashMap<String, Tracker>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let feed = Arc::new(HttpFeed::new(config.upstream_url.clone()));
        Self {
            config,
            feed,
            trackers: RwLock::new(HashMap::new()),
        }
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            poll_interval: self.config.poll_interval,
            tick_interval: self.config.tick_interval,
            ..Default::default()
        }
    }

    /// Stops trackers that have not been read within the idle timeout.
    pub async fn evict_idle(&self) -> usize {
        let mut trackers = self.trackers.write().await;
        let evicted = evict_idle(&mut trackers, self.config.idle_timeout);
        if evicted > 0 {
            info!("Evicted {evicted} idle trackers, {} left", trackers.len());
        }
        evicted
    }
}
