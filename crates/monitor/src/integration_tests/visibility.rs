use crate::lines::LineGroup;

use super::viewer;

#[test]
fn test_hiding_a_group_removes_its_lines() {
    let mut viewer = viewer();
    viewer.respond(r#"{"body": {"110kV": [0.2, 0.9], "220kV": [0.3]}}"#);
    viewer.poll_cycle();

    viewer.set_group_visibility(LineGroup::Kv110, false);
    assert!(viewer.line(LineGroup::Kv110, "LT26").is_none());
    assert!(viewer.line(LineGroup::Kv110, "LT27").is_none());
    assert_eq!(viewer.overlay().len(), 1);
    assert!(viewer.line(LineGroup::Kv220, "LT08").is_some());
}

#[test]
fn test_show_restores_without_a_fetch() {
    let mut viewer = viewer();
    viewer.respond(r#"{"body": {"110kV": [0.2, 0.9, 0.4]}}"#);
    viewer.poll_cycle();
    let before = viewer.overlay().clone();
    let requests = viewer.requests_sent();

    viewer.set_group_visibility(LineGroup::Kv110, false);
    viewer.set_group_visibility(LineGroup::Kv110, true);

    assert_eq!(viewer.overlay(), &before);
    assert_eq!(viewer.requests_sent(), requests);
}

#[test]
fn test_hidden_critical_line_does_not_blink() {
    let mut viewer = viewer();
    viewer.respond(r#"{"body": {"220kV": [0.95]}}"#);
    viewer.poll_cycle();
    assert!(viewer.overlay().any_blinking());

    viewer.set_group_visibility(LineGroup::Kv220, false);
    assert!(!viewer.overlay().any_blinking());
    viewer.tick(5);
    assert!(!viewer.resource::<crate::blink::BlinkClock>().is_running());
}

#[test]
fn test_hidden_group_still_receives_updates() {
    let mut viewer = viewer();
    viewer.set_group_visibility(LineGroup::Kv220, false);
    viewer.respond(r#"{"body": {"220kV": [0.55]}}"#);
    viewer.poll_cycle();
    assert!(viewer.line(LineGroup::Kv220, "LT08").is_none());

    viewer.set_group_visibility(LineGroup::Kv220, true);
    assert_eq!(viewer.line(LineGroup::Kv220, "LT08").unwrap().marker_label, "55%");
}

#[test]
fn test_repeated_hide_is_idempotent() {
    let mut viewer = viewer();
    viewer.set_group_visibility(LineGroup::Kv66, false);
    viewer.set_group_visibility(LineGroup::Kv66, false);
    assert!(!viewer
        .resource::<crate::overlay::GroupVisibility>()
        .is_visible(LineGroup::Kv66));
    assert_eq!(viewer.overlay().len(), 4);
}
