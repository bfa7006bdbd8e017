#![cfg(feature = "test-utils")]

use serde_json::json;

use shipper::error::ErrorKind;
use shipper::selector::{Selector, Settings};
use shipper::test_utils::event::{event_with_fields, fixed_timestamp};
use shipper::types::Event;
use shipper_config::shared::SelectorConfig;
use shipper_telemetry::tracing::init_test_tracing;

const SETTINGS: Settings = Settings {
    key: "index",
    multi_key: "indices",
    enable_single_only: true,
    fail_empty: false,
};

fn build(selector_json: &str) -> Selector {
    let config: SelectorConfig = serde_json::from_str(selector_json).unwrap();
    Selector::from_config(&config, &SETTINGS).unwrap()
}

#[test]
fn const_selector_ignores_event_content() {
    init_test_tracing();

    let selector = build(r#"{"key": "abc"}"#);
    assert!(selector.is_const());

    for event in [
        event_with_fields(json!({})),
        event_with_fields(json!({"anything": {"nested": true}})),
    ] {
        assert_eq!(selector.select(&event).unwrap(), "abc");
    }
}

#[test]
fn format_selector_uses_default_for_missing_fields() {
    init_test_tracing();

    let selector = build(r#"{"keys": [{"key": "%{[user]}", "default": "anon"}]}"#);

    let named = selector
        .select(&event_with_fields(json!({"user": "bob"})))
        .unwrap();
    assert_eq!(named, "bob");

    let missing = selector.select(&event_with_fields(json!({}))).unwrap();
    assert_eq!(missing, "anon");
}

#[test]
fn list_skips_unmatched_entries() {
    init_test_tracing();

    // The first entry is guarded by a condition that never matches here,
    // so the second entry wins.
    let selector = build(
        r#"{
            "keys": [
                {"key": "x", "when": {"has_fields": ["never_set"]}},
                {"key": "y"}
            ]
        }"#,
    );

    assert_eq!(selector.select(&event_with_fields(json!({}))).unwrap(), "y");
}

#[test]
fn mapping_selector_translates_codes() {
    init_test_tracing();

    let selector = build(
        r#"{
            "keys": [
                {
                    "key": "%{[code]}",
                    "mappings": {"1": "ok", "2": "err"},
                    "default": "unknown"
                }
            ]
        }"#,
    );

    assert_eq!(
        selector
            .select(&event_with_fields(json!({"code": "2"})))
            .unwrap(),
        "err"
    );
    assert_eq!(
        selector
            .select(&event_with_fields(json!({"code": "9"})))
            .unwrap(),
        "unknown"
    );
}

#[test]
fn timestamp_templates_render_daily_destinations() {
    init_test_tracing();

    let selector = build(r#"{"key": "logs-%{+%Y.%m.%d}"}"#);

    let event = Event::new(fixed_timestamp());
    assert_eq!(selector.select(&event).unwrap(), "logs-2024.05.01");
}

#[test]
fn metadata_paths_route_preassigned_events() {
    init_test_tracing();

    let selector = build(r#"{"key": "%{[@metadata.raw_index]:fallback}"}"#);

    let mut event = event_with_fields(json!({}));
    event
        .metadata
        .insert("raw_index".to_string(), json!("overridden"));
    assert_eq!(selector.select(&event).unwrap(), "overridden");

    let plain = event_with_fields(json!({}));
    assert_eq!(selector.select(&plain).unwrap(), "fallback");
}

#[test]
fn fail_empty_is_a_configuration_error() {
    init_test_tracing();

    let settings = Settings {
        fail_empty: true,
        ..SETTINGS
    };

    let config: SelectorConfig = serde_json::from_str("{}").unwrap();
    let err = Selector::from_config(&config, &settings).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigError);
}

#[test]
fn guarded_mapping_routes_levels_with_fallthrough() {
    init_test_tracing();

    // A realistic routing table: alerts for high-severity events, a dated
    // index for everything else.
    let selector = build(
        r#"{
            "key": "logs-%{+%Y.%m.%d}",
            "keys": [
                {
                    "key": "%{[event.level]}",
                    "mappings": {"critical": "alerts", "error": "alerts"},
                    "when": {"has_fields": ["event.level"]}
                }
            ]
        }"#,
    );

    let critical = event_with_fields(json!({"event": {"level": "critical"}}));
    assert_eq!(selector.select(&critical).unwrap(), "alerts");

    // A level outside the table maps to nothing, so the dated fallback
    // applies, as it does for events without a level at all.
    let info = event_with_fields(json!({"event": {"level": "info"}}));
    assert_eq!(selector.select(&info).unwrap(), "logs-2024.05.01");

    let unleveled = event_with_fields(json!({}));
    assert_eq!(selector.select(&unleveled).unwrap(), "logs-2024.05.01");
}
