use livetrack::{
    progress::{DelayBaseline, StopRecord, TripSession},
    shared::{Duration, Time},
};

fn stop(number: &str, time: &str, status: &str) -> StopRecord {
    StopRecord::new(format!("Stop {number}"), number, time, status)
}

#[test]
fn first_prediction_is_kept() {
    let mut baseline = DelayBaseline::new();
    baseline.observe(&[stop("1", "17:00", "Predicted")]);
    baseline.observe(&[stop("1", "17:04", "Predicted")]);
    assert_eq!(baseline.first_seen("1"), Some(Time::from_hms(17, 0, 0)));
    assert_eq!(baseline.len(), 1);
}

#[test]
fn only_parseable_predictions_are_recorded() {
    let mut baseline = DelayBaseline::new();
    baseline.observe(&[
        stop("1", "17:00", "Departed"),
        stop("2", "??", "Predicted"),
        stop("3", "17:10", "Unknown"),
    ]);
    assert!(baseline.is_empty());

    baseline.observe(&[stop("2", "17:06", "Predicted")]);
    assert_eq!(baseline.first_seen("2"), Some(Time::from_hms(17, 6, 0)));
}

#[test]
fn drift_against_first_prediction() {
    let mut baseline = DelayBaseline::new();
    baseline.observe(&[stop("1", "17:00", "Predicted")]);

    let later = stop("1", "17:04", "Predicted");
    assert_eq!(baseline.drift(&later), Some(Duration::from_minutes(4)));
    assert_eq!(baseline.delay_minutes(&later), Some(4));

    let earlier = stop("1", "16:58", "Predicted");
    assert_eq!(baseline.delay_minutes(&earlier), Some(-2));

    assert_eq!(baseline.delay_minutes(&stop("9", "17:00", "Predicted")), None);
}

#[test]
fn stops_with_delay_are_listed_in_route_order() {
    let mut baseline = DelayBaseline::new();
    baseline.observe(&[
        stop("1", "17:00", "Predicted"),
        stop("2", "17:05", "Predicted"),
        stop("3", "17:10", "Predicted"),
    ]);
    let latest = [
        stop("1", "17:03", "Departed"),
        stop("2", "17:05", "Predicted"),
        stop("3", "17:12", "Predicted"),
    ];
    let delays = baseline.stops_with_delay(&latest);
    assert_eq!(delays.len(), 2);
    assert_eq!(delays[0].index, 0);
    assert_eq!(delays[0].minutes, 3);
    assert_eq!(delays[1].stop_number.as_ref(), "3");
    assert_eq!(delays[1].minutes, 2);
}

#[test]
fn session_tracks_delay_of_next_stop() {
    let mut session = TripSession::new("2615");
    session.update(vec![
        stop("1", "17:00", "Departed"),
        stop("2", "17:05", "Predicted"),
    ]);
    session.update(vec![
        stop("1", "17:00", "Departed"),
        stop("2", "17:08", "Predicted"),
    ]);
    let progress = session.compute(Time::from_hms(17, 4, 0));
    assert_eq!(progress.current_index, Some(0));
    assert_eq!(session.delay_minutes(&progress), Some(3));
}

#[test]
fn session_keeps_last_stops_between_updates() {
    let mut session = TripSession::new("2615");
    session.update(vec![stop("1", "17:00", "Departed"), stop("2", "17:10", "Predicted")]);
    let first = session.compute(Time::from_hms(17, 5, 0));
    let second = session.compute(Time::from_hms(17, 5, 0));
    assert_eq!(first, second);
    assert_eq!(session.stops().len(), 2);
}

#[test]
fn retarget_discards_state() {
    let mut session = TripSession::new("2615");
    session.update(vec![stop("1", "17:00", "Predicted")]);
    assert!(!session.retarget("2615"));
    assert_eq!(session.baseline().len(), 1);

    assert!(session.retarget("3001"));
    assert_eq!(session.trip_id(), "3001");
    assert!(session.baseline().is_empty());
    assert!(session.stops().is_empty());
}

#[test]
fn session_hint_pins_current_stop() {
    let mut session = TripSession::new("2615");
    session.update(vec![
        stop("1", "17:00", "Departed"),
        stop("2", "17:05", "Predicted"),
        stop("3", "17:10", "Predicted"),
    ]);
    session.set_current_stop_hint(Some("2"));
    let progress = session.compute(Time::from_hms(17, 6, 0));
    assert_eq!(progress.current_index, Some(1));
}
