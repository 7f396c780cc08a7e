use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use livetrack::{
    progress::{StopDelay, StopRecord, TripProgress, TripSession},
    shared::time::Time,
    source::TripLiveDetails,
};
use tokio::{
    sync::watch,
    task::{JoinHandle, JoinSet},
    time::{MissedTickBehavior, interval, timeout},
};
use tracing::{debug, info, warn};

use crate::feed::{FeedError, StopFeed};

/// Everything published for a fleet after one recomputation.
#[derive(Debug, Clone)]
pub struct TripUpdate {
    pub fleet_id: Arc<str>,
    pub route_number: Option<String>,
    pub service_alert: Option<String>,
    pub stops: Arc<[StopRecord]>,
    pub progress: TripProgress,
    pub delay_minutes: Option<i32>,
    pub delays: Vec<StopDelay>,
}

impl TripUpdate {
    pub fn stop_delay(&self, index: usize) -> Option<i32> {
        self.delays
            .iter()
            .find(|delay| delay.index == index)
            .map(|delay| delay.minutes)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    /// Also the time limit of a single fetch.
    pub poll_interval: Duration,
    pub tick_interval: Duration,
    pub clock: fn() -> Time,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            tick_interval: Duration::from_secs(2),
            clock: Time::now,
        }
    }
}

/// Background task following one fleet. Dropping it stops the task, any
/// fetch still in flight, and discards its session.
pub struct Tracker {
    fleet_id: Arc<str>,
    updates: watch::Receiver<Option<Arc<TripUpdate>>>,
    task: JoinHandle<()>,
    started: Instant,
    // Milliseconds after `started`.
    last_access: AtomicU64,
}

impl Tracker {
    pub fn spawn<F: StopFeed>(feed: Arc<F>, fleet_id: &str, config: TrackerConfig) -> Self {
        let fleet_id: Arc<str> = fleet_id.into();
        let (sender, updates) = watch::channel(None);
        info!("Tracking fleet {fleet_id}");
        let task = tokio::spawn(run(feed, fleet_id.clone(), config, sender));
        Self {
            fleet_id,
            updates,
            task,
            started: Instant::now(),
            last_access: AtomicU64::new(0),
        }
    }

    pub fn fleet_id(&self) -> &str {
        &self.fleet_id
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<TripUpdate>>> {
        self.updates.clone()
    }

    pub fn latest(&self) -> Option<Arc<TripUpdate>> {
        self.updates.borrow().clone()
    }

    /// Marks the tracker as read by a consumer.
    pub fn touch(&self) {
        let elapsed = self.started.elapsed().as_millis() as u64;
        self.last_access.store(elapsed, Ordering::Relaxed);
    }

    pub fn idle_for(&self) -> Duration {
        let last_access = Duration::from_millis(self.last_access.load(Ordering::Relaxed));
        self.started.elapsed().saturating_sub(last_access)
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        info!("Stopped tracking fleet {}", self.fleet_id);
        self.task.abort();
    }
}

/// Drops trackers nobody has read for `max_idle`. Returns how many went.
pub fn evict_idle(trackers: &mut HashMap<String, Tracker>, max_idle: Duration) -> usize {
    let before = trackers.len();
    trackers.retain(|_, tracker| tracker.idle_for() < max_idle);
    before - trackers.len()
}

/// Route and origin stop of the trip a fleet is running.
#[derive(Debug, Clone, PartialEq)]
struct TripIdentity {
    route: Option<String>,
    origin: Arc<str>,
}

impl TripIdentity {
    fn of(details: &TripLiveDetails) -> Option<Self> {
        let origin = details.stops.first()?.stop_number.clone();
        Some(Self {
            route: details.route_number.clone(),
            origin,
        })
    }

    /// A missing route number is no evidence of a new trip.
    fn is_new_trip(&self, previous: &Self) -> bool {
        self.origin != previous.origin
            || matches!((&self.route, &previous.route), (Some(route), Some(old)) if route != old)
    }

    fn key(&self, fleet_id: &str) -> String {
        let route = self.route.as_deref().unwrap_or("-");
        format!("{fleet_id}:{route}:{}", self.origin)
    }
}

/// What the tracker knows about its fleet between polls.
struct FleetState {
    fleet_id: Arc<str>,
    session: TripSession,
    identity: Option<TripIdentity>,
    details: Option<TripLiveDetails>,
}

impl FleetState {
    fn new(fleet_id: Arc<str>) -> Self {
        Self {
            session: TripSession::new(format!("{fleet_id}:-:-")),
            fleet_id,
            identity: None,
            details: None,
        }
    }

    fn apply(&mut self, mut live: TripLiveDetails) {
        let Some(mut identity) = TripIdentity::of(&live) else {
            warn!("Fleet {} returned no stops, keeping the last ones", self.fleet_id);
            return;
        };

        if let Some(previous) = &self.identity {
            if identity.route.is_none() {
                identity.route = previous.route.clone();
                live.route_number = previous.route.clone();
            }
            if identity.is_new_trip(previous) {
                self.session.retarget(&identity.key(&self.fleet_id));
            }
        } else {
            self.session.retarget(&identity.key(&self.fleet_id));
        }

        self.session.update(live.stops.clone());
        self.identity = Some(identity);
        self.details = Some(live);
    }

    fn publish(&self, now: Time) -> Option<TripUpdate> {
        let live = self.details.as_ref()?;
        let progress = self.session.compute(now);
        Some(TripUpdate {
            fleet_id: self.fleet_id.clone(),
            route_number: live.route_number.clone(),
            service_alert: live.service_alert.clone(),
            stops: self.session.shared_stops(),
            delay_minutes: self.session.delay_minutes(&progress),
            delays: self.session.baseline().stops_with_delay(self.session.stops()),
            progress,
        })
    }
}

type FetchResult = Result<Result<TripLiveDetails, FeedError>, tokio::time::error::Elapsed>;

async fn run<F: StopFeed>(
    feed: Arc<F>,
    fleet_id: Arc<str>,
    config: TrackerConfig,
    sender: watch::Sender<Option<Arc<TripUpdate>>>,
) {
    let mut poll = interval(config.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut tick = interval(config.tick_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut state = FleetState::new(fleet_id.clone());
    // At most one fetch in flight, aborted with the set when the task ends.
    let mut fetches: JoinSet<FetchResult> = JoinSet::new();

    loop {
        tokio::select! {
            _ = poll.tick() => {
                if fetches.is_empty() {
                    let feed = feed.clone();
                    let fleet_id = fleet_id.clone();
                    let limit = config.poll_interval;
                    fetches.spawn(async move { timeout(limit, feed.fetch(&fleet_id)).await });
                } else {
                    debug!("Fetch for fleet {fleet_id} still running");
                }
                continue;
            }
            Some(joined) = fetches.join_next() => {
                match joined {
                    Ok(Ok(Ok(live))) => state.apply(live),
                    // Keep showing the last known stops.
                    Ok(Ok(Err(err))) => warn!("Failed to fetch fleet {fleet_id}: {err}"),
                    Ok(Err(_)) => warn!("Fetch for fleet {fleet_id} timed out"),
                    Err(err) => warn!("Fetch task for fleet {fleet_id} failed: {err}"),
                }
            }
            _ = tick.tick() => {}
        }

        let now = (config.clock)();
        let Some(update) = state.publish(now) else {
            continue;
        };
        debug!(
            "Fleet {fleet_id} at {now}: {:.3}",
            update.progress.overall_progress
        );
        sender.send_replace(Some(Arc::new(update)));
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use reqwest::StatusCode;
    use tokio::time::timeout;

    use super::*;
    use crate::feed::FeedError;

    const WAIT: Duration = Duration::from_secs(2);

    /// Replays canned responses, repeating the last one. `None` fails.
    struct FakeFeed {
        responses: Mutex<VecDeque<Option<TripLiveDetails>>>,
        calls: AtomicUsize,
    }

    impl FakeFeed {
        fn new(responses: Vec<Option<TripLiveDetails>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl StopFeed for FakeFeed {
        async fn fetch(&self, _fleet_id: &str) -> Result<TripLiveDetails, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            let response = if responses.len() > 1 {
                responses.pop_front().flatten()
            } else {
                responses.front().cloned().flatten()
            };
            response.ok_or(FeedError::Status(StatusCode::BAD_GATEWAY))
        }
    }

    fn details(second_stop_time: &str) -> TripLiveDetails {
        TripLiveDetails {
            route_number: Some("950".into()),
            associated_fleet_number: Some("2615".into()),
            service_alert: None,
            stops: vec![
                StopRecord::new("Perth Busport", "10001", "17:00", "Departed"),
                StopRecord::new("Wellington St", "10002", second_stop_time, "Predicted"),
            ],
        }
    }

    fn config() -> TrackerConfig {
        TrackerConfig {
            poll_interval: Duration::from_millis(20),
            tick_interval: Duration::from_millis(5),
            clock: || Time::from_hms(17, 4, 0),
        }
    }

    #[tokio::test]
    async fn publishes_progress_after_first_fetch() {
        let feed = FakeFeed::new(vec![Some(details("17:10"))]);
        let tracker = Tracker::spawn(feed, "2615", config());
        let mut updates = tracker.subscribe();

        let update = timeout(WAIT, updates.wait_for(|update| update.is_some()))
            .await
            .unwrap()
            .unwrap()
            .clone()
            .unwrap();
        assert_eq!(update.fleet_id.as_ref(), "2615");
        assert_eq!(update.route_number.as_deref(), Some("950"));
        assert_eq!(update.progress.current_index, Some(0));
        assert!((update.progress.overall_progress - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn keeps_last_stops_when_fetch_fails() {
        let feed = FakeFeed::new(vec![Some(details("17:10")), None]);
        let tracker = Tracker::spawn(feed.clone(), "2615", config());

        timeout(WAIT, async {
            while feed.calls.load(Ordering::SeqCst) < 4 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let update = tracker.latest().unwrap();
        assert_eq!(update.stops.len(), 2);
        assert_eq!(update.progress.segments.len(), 1);
    }

    #[tokio::test]
    async fn measures_drift_from_first_prediction() {
        let feed = FakeFeed::new(vec![Some(details("17:05")), Some(details("17:08"))]);
        let tracker = Tracker::spawn(feed, "2615", config());
        let mut updates = tracker.subscribe();

        let update = timeout(
            WAIT,
            updates.wait_for(|update| {
                update
                    .as_ref()
                    .is_some_and(|update| update.delay_minutes == Some(3))
            }),
        )
        .await
        .unwrap()
        .unwrap()
        .clone()
        .unwrap();
        assert_eq!(update.stop_delay(1), Some(3));
        assert_eq!(update.stop_delay(0), None);
    }

    #[tokio::test]
    async fn new_trip_resets_baseline() {
        let mut next_trip = details("17:30");
        next_trip.route_number = Some("951".into());
        let feed = FakeFeed::new(vec![Some(details("17:05")), Some(next_trip)]);
        let tracker = Tracker::spawn(feed, "2615", config());
        let mut updates = tracker.subscribe();

        let update = timeout(
            WAIT,
            updates.wait_for(|update| {
                update
                    .as_ref()
                    .is_some_and(|update| update.route_number.as_deref() == Some("951"))
            }),
        )
        .await
        .unwrap()
        .unwrap()
        .clone()
        .unwrap();
        assert_eq!(update.delay_minutes, Some(0));
        assert!(update.delays.is_empty());
    }

    #[tokio::test]
    async fn dropping_tracker_stops_task() {
        let feed = FakeFeed::new(vec![Some(details("17:10"))]);
        let tracker = Tracker::spawn(feed, "2615", config());
        let mut updates = tracker.subscribe();
        drop(tracker);

        let closed = timeout(WAIT, async {
            while updates.changed().await.is_ok() {}
        })
        .await;
        assert!(closed.is_ok());
    }

    #[tokio::test]
    async fn empty_poll_keeps_baseline() {
        let mut empty = details("17:08");
        empty.stops.clear();
        let feed = FakeFeed::new(vec![
            Some(details("17:05")),
            Some(details("17:08")),
            Some(empty),
            Some(details("17:09")),
        ]);
        let tracker = Tracker::spawn(feed.clone(), "2615", config());
        let mut updates = tracker.subscribe();

        let update = timeout(
            WAIT,
            updates.wait_for(|update| {
                update
                    .as_ref()
                    .is_some_and(|update| update.delay_minutes == Some(4))
            }),
        )
        .await
        .unwrap()
        .unwrap()
        .clone()
        .unwrap();
        assert!(feed.calls.load(Ordering::SeqCst) >= 4);
        assert_eq!(update.stops.len(), 2);
        assert_eq!(update.stop_delay(1), Some(4));
    }

    #[tokio::test]
    async fn missing_route_keeps_baseline() {
        let mut unrouted = details("17:08");
        unrouted.route_number = None;
        let feed = FakeFeed::new(vec![
            Some(details("17:05")),
            Some(unrouted),
            Some(details("17:09")),
        ]);
        let tracker = Tracker::spawn(feed.clone(), "2615", config());
        let mut updates = tracker.subscribe();

        timeout(
            WAIT,
            updates.wait_for(|update| {
                update
                    .as_ref()
                    .is_some_and(|update| update.delay_minutes == Some(3))
            }),
        )
        .await
        .unwrap()
        .unwrap();
        let update = tracker.latest().unwrap();
        assert_eq!(update.route_number.as_deref(), Some("950"));

        let update = timeout(
            WAIT,
            updates.wait_for(|update| {
                update
                    .as_ref()
                    .is_some_and(|update| update.delay_minutes == Some(4))
            }),
        )
        .await
        .unwrap()
        .unwrap()
        .clone()
        .unwrap();
        assert_eq!(update.route_number.as_deref(), Some("950"));
    }

    /// Answers once, then never again.
    struct HangingFeed {
        calls: AtomicUsize,
    }

    impl StopFeed for HangingFeed {
        async fn fetch(&self, _fleet_id: &str) -> Result<TripLiveDetails, FeedError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(details("17:10"));
            }
            std::future::pending().await
        }
    }

    static HANGING_CLOCK_READS: AtomicUsize = AtomicUsize::new(0);

    fn counting_clock() -> Time {
        HANGING_CLOCK_READS.fetch_add(1, Ordering::SeqCst);
        Time::from_hms(17, 4, 0)
    }

    #[tokio::test]
    async fn ticks_continue_while_fetch_hangs() {
        let feed = Arc::new(HangingFeed {
            calls: AtomicUsize::new(0),
        });
        let config = TrackerConfig {
            clock: counting_clock,
            ..config()
        };
        let tracker = Tracker::spawn(feed.clone(), "2615", config);
        let mut updates = tracker.subscribe();
        timeout(WAIT, updates.wait_for(|update| update.is_some()))
            .await
            .unwrap()
            .unwrap();

        let before = HANGING_CLOCK_READS.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(300)).await;
        let recomputed = HANGING_CLOCK_READS.load(Ordering::SeqCst) - before;

        assert!(recomputed >= 10, "only {recomputed} recomputations");
        // Hung fetches time out and get retried.
        assert!(feed.calls.load(Ordering::SeqCst) > 2);
        assert_eq!(tracker.latest().unwrap().stops.len(), 2);
    }

    #[tokio::test]
    async fn evicts_only_unread_trackers() {
        let feed = FakeFeed::new(vec![Some(details("17:10"))]);
        let mut trackers = HashMap::new();
        trackers.insert("2615".to_string(), Tracker::spawn(feed.clone(), "2615", config()));
        trackers.insert("2616".to_string(), Tracker::spawn(feed, "2616", config()));

        tokio::time::sleep(Duration::from_millis(60)).await;
        trackers["2615"].touch();
        assert!(trackers["2615"].idle_for() < Duration::from_millis(40));

        let evicted = evict_idle(&mut trackers, Duration::from_millis(40));
        assert_eq!(evicted, 1);
        assert!(trackers.contains_key("2615"));
        assert!(!trackers.contains_key("2616"));
    }
}
