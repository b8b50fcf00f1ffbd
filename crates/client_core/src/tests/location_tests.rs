use super::*;
use std::sync::{Arc, Mutex as StdMutex};

fn recording_picker(value: Option<Coordinate>) -> (CoordinatePicker, Arc<StdMutex<Vec<Option<Coordinate>>>>) {
    let calls = Arc::new(StdMutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let picker = CoordinatePicker::new("from_location", value).on_change(move |value| {
        sink.lock().expect("calls").push(value);
    });
    (picker, calls)
}

#[test]
fn mount_does_not_report_initial_value() {
    let (mut picker, calls) = recording_picker(Some(Coordinate::new(1.0, 2.0)));
    picker.mount();
    assert!(calls.lock().expect("calls").is_empty());

    picker.open();
    assert!(picker.place_marker(Coordinate::new(3.0, 4.0)));
    assert_eq!(
        *calls.lock().expect("calls"),
        vec![Some(Coordinate::new(3.0, 4.0))]
    );
    assert_eq!(picker.value(), Some(Coordinate::new(3.0, 4.0)));
}

#[test]
fn closing_without_marker_keeps_committed_value() {
    let (mut picker, calls) = recording_picker(Some(Coordinate::new(1.0, 2.0)));
    picker.mount();

    picker.open();
    assert_eq!(
        picker.modal().expect("open").phase(),
        ModalPhase::AwaitingInput
    );
    picker.close();

    assert!(!picker.is_open());
    assert_eq!(picker.value(), Some(Coordinate::new(1.0, 2.0)));
    assert!(calls.lock().expect("calls").is_empty());
}

#[test]
fn marker_placement_replaces_previous_marker_and_survives_close() {
    let (mut picker, calls) = recording_picker(None);
    picker.mount();
    picker.open();
    picker.place_marker(Coordinate::new(10.0, 20.0));
    picker.place_marker(Coordinate::new(11.0, 21.0));
    assert_eq!(
        picker.modal().expect("open").phase(),
        ModalPhase::MarkerPlaced(Coordinate::new(11.0, 21.0))
    );
    picker.close();

    assert_eq!(picker.value(), Some(Coordinate::new(11.0, 21.0)));
    assert_eq!(calls.lock().expect("calls").len(), 2);

    picker.open();
    assert_eq!(picker.modal().expect("reopened").marker(), None);
}

#[test]
fn repeated_click_reports_once_per_opening() {
    let (mut picker, calls) = recording_picker(None);
    picker.mount();

    picker.open();
    picker.place_marker(Coordinate::new(3.0, 4.0));
    picker.place_marker(Coordinate::new(3.0, 4.0));
    picker.close();
    assert_eq!(calls.lock().expect("calls").len(), 1);

    picker.open();
    picker.place_marker(Coordinate::new(3.0, 4.0));
    assert_eq!(
        *calls.lock().expect("calls"),
        vec![Some(Coordinate::new(3.0, 4.0)), Some(Coordinate::new(3.0, 4.0))]
    );
}

#[test]
fn clicks_while_closed_are_ignored() {
    let (mut picker, calls) = recording_picker(None);
    picker.mount();
    assert!(!picker.place_marker(Coordinate::new(1.0, 1.0)));
    assert_eq!(picker.value(), None);
    assert!(calls.lock().expect("calls").is_empty());
}

#[test]
fn fields_render_both_components_under_one_name() {
    let mut picker = CoordinatePicker::new("to_location", None);
    assert_eq!(picker.lat_field().name, "to_location.lat");
    assert_eq!(picker.lng_field().name, "to_location.lng");
    assert_eq!(picker.lat_field().value, "");
    assert_eq!(picker.lng_field().placeholder, "Longitude");

    picker.sync_value(Some(Coordinate::new(51.5, -0.25)));
    assert_eq!(picker.lat_field().value, "51.5");
    assert_eq!(picker.lng_field().value, "-0.25");
}

#[test]
fn controlled_value_sync_does_not_report_back() {
    let (mut picker, calls) = recording_picker(None);
    picker.mount();
    picker.sync_value(Some(Coordinate::new(5.0, 6.0)));
    assert_eq!(picker.value(), Some(Coordinate::new(5.0, 6.0)));
    assert!(calls.lock().expect("calls").is_empty());
}

#[test]
fn blur_forwards_to_handler() {
    let blurs = Arc::new(StdMutex::new(0));
    let sink = Arc::clone(&blurs);
    let mut picker = CoordinatePicker::new("from_location", None).on_blur(move || {
        *sink.lock().expect("blurs") += 1;
    });
    picker.blur();
    picker.blur();
    assert_eq!(*blurs.lock().expect("blurs"), 2);
}

#[test]
fn geolocation_only_recenters_the_map() {
    let (mut picker, calls) = recording_picker(None);
    picker = picker.with_geolocation(true);
    picker.mount();

    let ticket = picker.open().expect("lookup ticket");
    assert_eq!(picker.modal().expect("open").center(), DEFAULT_MAP_CENTER);
    assert_eq!(picker.modal().expect("open").lookup(), &LookupState::Pending);

    assert!(picker.apply_lookup(ticket, Ok(Coordinate::new(48.85, 2.35))));
    let modal = picker.modal().expect("open");
    assert_eq!(modal.center(), Coordinate::new(48.85, 2.35));
    assert_eq!(modal.phase(), ModalPhase::AwaitingInput);
    assert_eq!(picker.value(), None);
    assert!(calls.lock().expect("calls").is_empty());
}

#[test]
fn late_estimate_does_not_move_map_off_placed_marker() {
    let mut picker = CoordinatePicker::new("from_location", None).with_geolocation(true);
    picker.mount();
    let ticket = picker.open().expect("ticket");
    picker.place_marker(Coordinate::new(7.0, 8.0));

    assert!(picker.apply_lookup(ticket, Ok(Coordinate::new(48.85, 2.35))));
    let modal = picker.modal().expect("open");
    assert_eq!(modal.center(), DEFAULT_MAP_CENTER);
    assert_eq!(modal.phase(), ModalPhase::MarkerPlaced(Coordinate::new(7.0, 8.0)));
    assert_eq!(picker.value(), Some(Coordinate::new(7.0, 8.0)));
}

#[test]
fn lookup_is_issued_once_per_opening() {
    let mut picker = CoordinatePicker::new("from_location", None).with_geolocation(true);
    picker.mount();
    let first = picker.open().expect("ticket");
    assert!(picker.open().is_none());
    picker.close();
    let second = picker.open().expect("ticket");
    assert_ne!(first, second);

    assert!(!picker.apply_lookup(first, Ok(Coordinate::new(0.0, 0.0))));
    assert_eq!(picker.modal().expect("open").center(), DEFAULT_MAP_CENTER);
    assert!(picker.apply_lookup(second, Ok(Coordinate::new(1.0, 1.0))));
    assert!(!picker.apply_lookup(second, Ok(Coordinate::new(2.0, 2.0))));
}

#[test]
fn lookup_after_close_is_dropped() {
    let mut picker = CoordinatePicker::new("from_location", None).with_geolocation(true);
    picker.mount();
    let ticket = picker.open().expect("ticket");
    picker.close();
    assert!(!picker.apply_lookup(ticket, Ok(Coordinate::new(1.0, 1.0))));
}

#[test]
fn failed_lookup_falls_back_to_manual_pick_and_allows_retry() {
    let mut picker = CoordinatePicker::new("from_location", None).with_geolocation(true);
    picker.mount();
    assert!(picker.retry_lookup().is_none());

    let ticket = picker.open().expect("ticket");
    assert!(picker.retry_lookup().is_none());
    picker.apply_lookup(ticket, Err(LocationUnavailable::PermissionDenied));
    assert_eq!(
        picker.modal().expect("open").lookup(),
        &LookupState::Unavailable(LocationUnavailable::PermissionDenied)
    );

    assert!(picker.place_marker(Coordinate::new(7.0, 8.0)));
    assert_eq!(picker.value(), Some(Coordinate::new(7.0, 8.0)));

    let retry = picker.retry_lookup().expect("retry ticket");
    assert_eq!(retry, ticket);
    assert!(picker.apply_lookup(retry, Ok(Coordinate::new(9.0, 9.0))));
}

#[test]
fn no_lookup_without_geolocation() {
    let mut picker = CoordinatePicker::new("from_location", None);
    picker.mount();
    assert!(picker.open().is_none());
    assert_eq!(
        picker.modal().expect("open").lookup(),
        &LookupState::NotRequested
    );
}

#[tokio::test]
async fn run_lookup_applies_provider_result() {
    let picker = Mutex::new(CoordinatePicker::new("to_location", None).with_geolocation(true));
    let ticket = {
        let mut guard = picker.lock().await;
        guard.mount();
        guard.open().expect("ticket")
    };

    let provider = FixedGeolocation(Coordinate::new(40.4, -3.7));
    assert!(run_lookup(&picker, &provider, ticket).await);
    assert_eq!(
        picker.lock().await.modal().expect("open").center(),
        Coordinate::new(40.4, -3.7)
    );
}

#[tokio::test]
async fn unsupported_provider_degrades_silently() {
    let picker = Mutex::new(CoordinatePicker::new("to_location", None).with_geolocation(true));
    let ticket = {
        let mut guard = picker.lock().await;
        guard.mount();
        guard.open().expect("ticket")
    };

    assert!(!NoGeolocation.is_available());
    assert!(run_lookup(&picker, &NoGeolocation, ticket).await);
    let guard = picker.lock().await;
    let modal = guard.modal().expect("open");
    assert_eq!(
        modal.lookup(),
        &LookupState::Unavailable(LocationUnavailable::Unsupported)
    );
    assert_eq!(modal.center(), DEFAULT_MAP_CENTER);
}
