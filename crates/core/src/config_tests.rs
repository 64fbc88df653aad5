// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use tempfile::TempDir;
use yare::parameterized;

#[test]
fn empty_file_yields_defaults() {
    let config = Config::from_toml_str("").unwrap();
    assert_eq!(config.realtime.hub_path, "/hubs/transport");
    assert_eq!(config.realtime.max_reconnect_attempts, 10);
    assert_eq!(config.realtime.heartbeat_interval(), Some(Duration::from_secs(15)));
    assert_eq!(config.connectivity.probe_timeout(), Duration::from_secs(5));
    assert_eq!(config.connectivity.recheck_interval(), Duration::from_secs(30));
    assert_eq!(config.queue.processing_interval(), Duration::from_secs(5));
    assert_eq!(config.queue.max_concurrent, 1);
    assert_eq!(config.queue.max_action_age(), Duration::from_secs(604_800));
}

#[test]
fn partial_sections_keep_other_defaults() {
    let config = Config::from_toml_str(
        r#"
        base_url = "https://api.example.com"

        [realtime]
        max_reconnect_attempts = 3
        heartbeat_interval_ms = 0

        [queue]
        max_concurrent = 4
        "#,
    )
    .unwrap();
    assert_eq!(config.realtime.max_reconnect_attempts, 3);
    assert_eq!(config.realtime.initial_reconnect_delay_ms, 1000);
    assert!(config.realtime.heartbeat_interval().is_none());
    assert_eq!(config.queue.max_concurrent, 4);
    assert_eq!(config.queue.storage_key, "offline_action_queue");
}

#[parameterized(
    https = { "https://api.example.com", "wss://api.example.com/hubs/transport" },
    http_trailing_slash = { "http://10.0.2.2:5080/", "ws://10.0.2.2:5080/hubs/transport" },
    already_ws = { "ws://localhost:5080", "ws://localhost:5080/hubs/transport" },
)]
fn hub_url_maps_scheme(base: &str, expected: &str) {
    let config = Config {
        base_url: base.to_string(),
        ..Config::default()
    };
    assert_eq!(config.hub_url(), expected);
}

#[test]
fn rejects_empty_probe_list() {
    let err = Config::from_toml_str("[connectivity]\nprobe_endpoints = []").unwrap_err();
    assert!(err.to_string().contains("probe_endpoints"));
}

#[test]
fn rejects_zero_concurrency() {
    let err = Config::from_toml_str("[queue]\nmax_concurrent = 0").unwrap_err();
    assert!(err.to_string().contains("max_concurrent"));
}

#[parameterized(
    recheck = { "[connectivity]\nrecheck_interval_ms = 0", "recheck_interval_ms" },
    processing = { "[queue]\nprocessing_interval_ms = 0", "processing_interval_ms" },
    connect_timeout = { "[realtime]\nconnect_timeout_ms = 0", "connect_timeout_ms" },
    invocation_timeout = { "[realtime]\ninvocation_timeout_ms = 0", "invocation_timeout_ms" },
)]
fn rejects_zero_periods(toml: &str, field: &str) {
    let err = Config::from_toml_str(toml).unwrap_err();
    assert!(err.to_string().contains(field));
}

#[test]
fn unvalidated_zero_periods_are_clamped() {
    let mut config = Config::default();
    config.connectivity.recheck_interval_ms = 0;
    config.queue.processing_interval_ms = 0;

    assert_eq!(config.connectivity.recheck_interval(), Duration::from_millis(1));
    assert_eq!(config.queue.processing_interval(), Duration::from_millis(1));
}

#[test]
fn rejects_inverted_backoff() {
    let err = Config::from_toml_str(
        "[realtime]\ninitial_reconnect_delay_ms = 5000\nmax_reconnect_delay_ms = 1000",
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn rejects_malformed_toml() {
    let err = Config::from_toml_str("[realtime\n").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn load_reads_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("rideline.toml");
    std::fs::write(&path, "[realtime]\nhub_path = \"/hubs/live\"\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.realtime.hub_path, "/hubs/live");
}

#[test]
fn load_missing_file_is_io_error() {
    let temp = TempDir::new().unwrap();
    let err = Config::load(&temp.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn backoff_uses_configured_delays() {
    let config = Config::default();
    let backoff = config.realtime.backoff();
    assert_eq!(backoff.next_delay(0), Duration::from_millis(1000));
    assert_eq!(backoff.next_delay(10), Duration::from_millis(30_000));
}
