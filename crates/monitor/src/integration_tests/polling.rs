use std::time::Duration;

use crate::blink::BlinkPhase;
use crate::error::FetchError;
use crate::lines::{LineColor, LineGroup};
use crate::overlay::EffectiveColor;
use crate::test_harness::{TestViewer, STEP, TEST_INTERVAL};

use super::viewer;

// ====================================================================
// Refresh loop
// ====================================================================

#[test]
fn test_first_request_waits_one_interval() {
    let mut viewer = viewer();
    viewer.respond(r#"{"body": {"110kV": [0.5]}}"#);

    let frames = (TEST_INTERVAL.as_millis() / STEP.as_millis()) as u32;
    viewer.tick(frames - 1);
    viewer.settle();
    assert_eq!(viewer.requests_sent(), 0);

    viewer.tick(1);
    viewer.settle();
    assert_eq!(viewer.requests_sent(), 1);
    assert_eq!(viewer.line(LineGroup::Kv110, "LT26").unwrap().marker_label, "50%");
}

#[test]
fn test_snapshot_sets_labels_and_blinking() {
    let mut viewer = viewer();
    viewer.respond(r#"{"body": {"110kV": [0.2, 0.75, 0.9]}}"#);
    viewer.poll_cycle();

    let lt26 = viewer.line(LineGroup::Kv110, "LT26").unwrap();
    assert_eq!(lt26.marker_label, "20%");
    assert!(!lt26.is_blinking);
    assert_eq!(lt26.effective_color, EffectiveColor::Steady(LineColor::Lime));

    let lt27 = viewer.line(LineGroup::Kv110, "LT27").unwrap();
    assert_eq!(lt27.marker_label, "75%");
    assert!(lt27.is_blinking);
    assert_eq!(lt27.effective_color.at(BlinkPhase::Alert), LineColor::Red);

    let lt30 = viewer.line(LineGroup::Kv110, "LT30").unwrap();
    assert_eq!(lt30.marker_label, "90%");
    assert_eq!(
        lt30.effective_color,
        EffectiveColor::Alternating {
            base: LineColor::Red,
            alert: LineColor::White
        }
    );

    // 220kV was not in the response.
    assert_eq!(viewer.line(LineGroup::Kv220, "LT08").unwrap().marker_label, "0%");
}

#[test]
fn test_single_line_sequence_over_three_polls() {
    let mut viewer = viewer();
    for p in [0.2, 0.75, 0.9] {
        viewer.respond(&format!(r#"{{"body": {{"110kV": [{p}]}}}}"#));
    }

    let mut blinking = Vec::new();
    let mut colors = Vec::new();
    for _ in 0..3 {
        viewer.poll_cycle();
        let lt26 = viewer.line(LineGroup::Kv110, "LT26").unwrap();
        blinking.push(lt26.is_blinking);
        colors.push(lt26.effective_color);
    }

    assert_eq!(blinking, vec![false, true, true]);
    let alternating = EffectiveColor::Alternating {
        base: LineColor::Lime,
        alert: LineColor::Red,
    };
    assert_eq!(
        colors,
        vec![EffectiveColor::Steady(LineColor::Lime), alternating, alternating]
    );
    assert_eq!(viewer.requests_sent(), 3);
}

#[test]
fn test_failed_poll_keeps_previous_state() {
    let mut viewer = viewer();
    viewer.respond(r#"{"body": {"110kV": [0.3, 0.8]}}"#);
    viewer.poll_cycle();
    let before = viewer.overlay().clone();
    let generation = viewer.store().generation();

    viewer.fail_next(FetchError::Status(503));
    viewer.poll_cycle();

    assert_eq!(viewer.overlay(), &before);
    assert_eq!(viewer.store().generation(), generation);
    let stats = &viewer.poller().stats;
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.applied, 1);
    assert!(stats.last_error.as_deref().unwrap().contains("503"));
}

#[test]
fn test_malformed_body_does_not_stop_polling() {
    let mut viewer = viewer();
    viewer.respond("<html>gateway timeout</html>");
    viewer.respond(r#"{"body": {"110kV": [0.1, 0.1, 0.95]}}"#);

    viewer.poll_cycle();
    assert_eq!(viewer.store().generation(), 0);
    assert_eq!(viewer.line(LineGroup::Kv110, "LT30").unwrap().marker_label, "0%");

    viewer.poll_cycle();
    assert_eq!(viewer.requests_sent(), 2);
    assert!(viewer.line(LineGroup::Kv110, "LT30").unwrap().is_blinking);
    assert_eq!(viewer.poller().stats.last_error, None);
}

#[test]
fn test_flat_list_body_is_rejected() {
    let mut viewer = viewer();
    viewer.respond("[0.9, 0.9, 0.9]");
    viewer.poll_cycle();
    assert!(!viewer.overlay().any_blinking());
    assert_eq!(viewer.poller().stats.failed, 1);
}

#[test]
fn test_group_left_out_of_response_reads_zero() {
    let mut viewer = viewer();
    viewer.respond(r#"{"body": {"110kV": [0.9, 0.9, 0.9], "220kV": [0.95]}}"#);
    viewer.respond(r#"{"body": {"110kV": [0.1]}}"#);
    viewer.poll_cycle();
    assert!(viewer.line(LineGroup::Kv220, "LT08").unwrap().is_blinking);
    viewer.poll_cycle();

    assert_eq!(viewer.line(LineGroup::Kv110, "LT26").unwrap().marker_label, "10%");
    // Short array: the rest of the group reads 0.
    assert_eq!(viewer.line(LineGroup::Kv110, "LT27").unwrap().marker_label, "0%");
    let lt08 = viewer.line(LineGroup::Kv220, "LT08").unwrap();
    assert_eq!(lt08.marker_label, "0%");
    assert!(!lt08.is_blinking);
    assert!(!viewer.overlay().any_blinking());
}

#[test]
fn test_malformed_group_keeps_prior_values() {
    let mut viewer = viewer();
    viewer.respond(r#"{"body": {"110kV": [0.2], "220kV": [0.8]}}"#);
    viewer.respond(r#"{"body": {"110kV": [0.3], "220kV": "unavailable"}}"#);
    viewer.poll_cycle();
    viewer.poll_cycle();

    assert_eq!(viewer.line(LineGroup::Kv110, "LT26").unwrap().marker_label, "30%");
    let lt08 = viewer.line(LineGroup::Kv220, "LT08").unwrap();
    assert_eq!(lt08.marker_label, "80%");
    assert!(lt08.is_blinking);
    assert_eq!(viewer.poller().stats.applied, 2);
}

#[test]
fn test_out_of_range_values_read_zero() {
    let mut viewer = viewer();
    viewer.respond(r#"{"body": {"110kV": [1.5, -0.2, "high"]}}"#);
    viewer.poll_cycle();
    for id in ["LT26", "LT27", "LT30"] {
        let line = viewer.line(LineGroup::Kv110, id).unwrap();
        assert_eq!(line.marker_label, "0%", "{id}");
        assert!(!line.is_blinking, "{id}");
    }
}

#[test]
fn test_one_request_per_interval() {
    let mut viewer = viewer();
    for _ in 0..5 {
        viewer.respond(r#"{"body": {}}"#);
    }
    for _ in 0..5 {
        viewer.poll_cycle();
    }
    assert_eq!(viewer.requests_sent(), 5);
    assert_eq!(viewer.poller().stats.sent, 5);
    assert_eq!(viewer.store().generation(), 5);
}

// ====================================================================
// Blink clock
// ====================================================================

#[test]
fn test_blink_toggles_every_half_period() {
    let mut viewer = viewer();
    viewer.respond(r#"{"body": {"220kV": [0.99]}}"#);
    viewer.poll_cycle();
    assert_eq!(viewer.blink_phase(), BlinkPhase::Base);

    viewer.tick(5);
    assert_eq!(viewer.blink_phase(), BlinkPhase::Alert);
    viewer.tick(5);
    assert_eq!(viewer.blink_phase(), BlinkPhase::Base);
}

#[test]
fn test_blink_stops_when_probability_drops() {
    let mut viewer = viewer();
    viewer.respond(r#"{"body": {"220kV": [0.99]}}"#);
    viewer.respond(r#"{"body": {"220kV": [0.05]}}"#);
    viewer.poll_cycle();
    viewer.tick(5);
    assert_eq!(viewer.blink_phase(), BlinkPhase::Alert);

    // Second cycle: 5 more frames finish the interval.
    viewer.tick(5);
    viewer.settle();
    assert!(!viewer.overlay().any_blinking());
    assert_eq!(viewer.blink_phase(), BlinkPhase::Base);
    assert!(!viewer.resource::<crate::blink::BlinkClock>().is_running());
}

// ====================================================================
// Lifecycle
// ====================================================================

#[test]
fn test_cancel_stops_requests() {
    let mut viewer = viewer().with_interval(Duration::from_millis(500));
    viewer.respond(r#"{"body": {"110kV": [0.4]}}"#);
    viewer.poll_cycle();
    assert_eq!(viewer.requests_sent(), 1);

    viewer.cancel_polling();
    viewer.tick(30);
    viewer.settle();
    assert_eq!(viewer.requests_sent(), 1);
    assert!(viewer.poller().is_cancelled());
    // The last applied state stays on screen.
    assert_eq!(viewer.line(LineGroup::Kv110, "LT26").unwrap().marker_label, "40%");
}

#[test]
fn test_app_exit_cancels_polling() {
    let mut viewer = viewer();
    viewer.send_exit();
    assert!(viewer.poller().is_cancelled());
    assert_eq!(viewer.poller().in_flight(), 0);

    viewer.tick(30);
    assert_eq!(viewer.requests_sent(), 0);
}

#[test]
fn test_restart_replaces_previous_poller() {
    let mut viewer = viewer().with_interval(Duration::from_millis(300));
    assert_eq!(viewer.poller().interval(), Duration::from_millis(300));
    viewer.respond(r#"{"body": {"110kV": [0.6]}}"#);
    viewer.poll_cycle();
    assert_eq!(viewer.requests_sent(), 1);
}

#[test]
fn test_zero_interval_disables_polling() {
    let mut viewer = TestViewer::with_polling("http://probabilities.test/latest", Duration::ZERO)
        .with_lines(super::valparaiso_lines());
    assert!(viewer
        .world_mut()
        .get_resource::<crate::poller::ProbabilityPoller>()
        .is_none());

    viewer.tick(50);
    assert_eq!(viewer.requests_sent(), 0);
    // The view still shows every line at 0%.
    assert_eq!(viewer.overlay().len(), 4);
}

#[test]
fn test_empty_endpoint_disables_polling() {
    let mut viewer = TestViewer::with_polling("", Duration::from_millis(1000));
    assert!(viewer
        .world_mut()
        .get_resource::<crate::poller::ProbabilityPoller>()
        .is_none());
}

#[test]
fn test_stats_track_time_since_applied() {
    let mut viewer = viewer();
    viewer.respond(r#"{"body": {}}"#);
    viewer.poll_cycle();
    viewer.tick(3);
    let since = viewer.poller().stats.since_last_applied().unwrap();
    assert_eq!(since, STEP * 3);
}
