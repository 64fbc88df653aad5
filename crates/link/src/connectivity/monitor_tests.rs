// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use crate::test_helpers::{BrokenInterfaces, Network, FAST};
use std::time::Duration;

#[tokio::test]
async fn no_interface_is_offline_without_probing() {
    let network = Network::new(ConnectionType::None, Some(FAST));

    let state = network.monitor.check_connectivity().await;

    assert!(!state.is_online());
    assert_eq!(state.connection_type(), ConnectionType::None);
    assert_eq!(state.network_quality(), NetworkQuality::None);
    assert!(state.last_checked().is_some());
    assert_eq!(network.probe.calls(), 0);
}

#[tokio::test]
async fn fast_probe_reports_good_quality() {
    let network = Network::new(ConnectionType::Wifi, Some(FAST));

    let state = network.monitor.check_connectivity().await;

    assert!(state.is_online());
    assert_eq!(state.connection_type(), ConnectionType::Wifi);
    assert_eq!(state.network_quality(), NetworkQuality::Good);
    assert!(network.monitor.is_online());
}

#[tokio::test]
async fn slow_probe_reports_poor_quality() {
    let network = Network::new(ConnectionType::Mobile, Some(Duration::from_millis(2500)));

    let state = network.monitor.check_connectivity().await;

    assert!(state.is_online());
    assert_eq!(state.network_quality(), NetworkQuality::Poor);
}

#[tokio::test]
async fn probe_at_threshold_is_still_good() {
    let network = Network::new(ConnectionType::Wifi, Some(Duration::from_millis(1500)));
    let state = network.monitor.check_connectivity().await;
    assert_eq!(state.network_quality(), NetworkQuality::Good);
}

#[tokio::test]
async fn interface_without_internet_is_not_online() {
    let network = Network::new(ConnectionType::Wifi, None);

    let state = network.monitor.check_connectivity().await;

    assert!(!state.is_online());
    assert_eq!(state.connection_type(), ConnectionType::Wifi);
    assert_eq!(state.network_quality(), NetworkQuality::None);
}

#[tokio::test]
async fn skipping_quality_reports_online_good_without_probing() {
    let network = Network::new(ConnectionType::Ethernet, None);

    let state = network.monitor.check_connectivity_with(true).await;

    assert!(state.is_online());
    assert_eq!(state.network_quality(), NetworkQuality::Good);
    assert_eq!(network.probe.calls(), 0);
}

#[tokio::test]
async fn interface_lookup_failure_degrades_to_offline() {
    let probe = Arc::new(crate::test_helpers::ScriptedProbe::new(Some(FAST)));
    let monitor = ConnectivityMonitor::new(
        ConnectivityConfig::default(),
        Arc::new(BrokenInterfaces::new()),
        probe,
    );

    let state = monitor.check_connectivity().await;

    assert!(!state.is_online());
    assert_eq!(state.connection_type(), ConnectionType::None);
}

#[tokio::test]
async fn test_internet_reachability_follows_probe() {
    let network = Network::new(ConnectionType::Wifi, Some(FAST));
    assert!(network.monitor.test_internet_reachability().await);

    network.probe.set(None);
    assert!(!network.monitor.test_internet_reachability().await);
}

#[tokio::test]
async fn repeated_identical_checks_emit_once() {
    let network = Network::new(ConnectionType::Wifi, Some(FAST));
    let mut rx = network.monitor.subscribe();
    rx.borrow_and_update();

    network.monitor.check_connectivity().await;
    assert!(rx.has_changed().unwrap());
    rx.borrow_and_update();

    network.monitor.check_connectivity().await;
    network.monitor.check_connectivity().await;
    assert!(!rx.has_changed().unwrap());

    // Timestamp still advances on the snapshot
    assert!(network.monitor.current().last_checked().is_some());
}

#[tokio::test]
async fn quality_change_alone_is_emitted() {
    let network = Network::new(ConnectionType::Wifi, Some(FAST));
    network.monitor.check_connectivity().await;
    let mut rx = network.monitor.subscribe();
    rx.borrow_and_update();

    network.probe.set(Some(Duration::from_secs(3)));
    network.monitor.check_connectivity().await;

    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().network_quality(), NetworkQuality::Poor);
}

#[tokio::test]
async fn late_subscriber_sees_latest_snapshot() {
    let network = Network::online().await;
    let rx = network.monitor.subscribe();
    assert!(rx.borrow().is_online());
}

#[tokio::test]
async fn initialize_checks_then_follows_interface_reports() {
    let network = Network::new(ConnectionType::None, Some(FAST));
    let state = network.monitor.initialize().await.unwrap();
    assert!(!state.is_online());

    let mut rx = network.monitor.subscribe();
    network.interfaces.report(ConnectionType::Wifi);

    let state = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.is_online()))
        .await
        .expect("monitor never went online")
        .unwrap()
        .clone();
    assert_eq!(state.connection_type(), ConnectionType::Wifi);

    network.interfaces.report(ConnectionType::None);
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| !s.is_online()))
        .await
        .expect("monitor never went offline")
        .unwrap();

    network.monitor.dispose();
}

#[tokio::test(start_paused = true)]
async fn periodic_recheck_runs_only_while_an_interface_is_present() {
    let network = Network::new(ConnectionType::Wifi, Some(FAST));
    network.monitor.initialize().await.unwrap();
    assert_eq!(network.probe.calls(), 1);

    tokio::time::sleep(Duration::from_millis(30_500)).await;
    assert_eq!(network.probe.calls(), 2);

    network.interfaces.report(ConnectionType::None);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!network.monitor.is_online());

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(network.probe.calls(), 2);

    network.monitor.dispose();
}

#[tokio::test(start_paused = true)]
async fn periodic_recheck_detects_internet_returning() {
    let network = Network::new(ConnectionType::Wifi, None);
    network.monitor.initialize().await.unwrap();
    assert!(!network.monitor.is_online());

    network.probe.set(Some(FAST));
    tokio::time::sleep(Duration::from_millis(30_500)).await;

    assert!(network.monitor.is_online());
    network.monitor.dispose();
}

#[tokio::test]
async fn initialize_twice_is_a_no_op() {
    let network = Network::new(ConnectionType::Wifi, Some(FAST));
    network.monitor.initialize().await.unwrap();
    network.monitor.initialize().await.unwrap();
    assert_eq!(network.probe.calls(), 1);
    network.monitor.dispose();
}

#[tokio::test]
async fn dispose_closes_stream_and_stops_publishing() {
    let network = Network::online().await;
    let mut rx = network.monitor.subscribe();
    rx.borrow_and_update();

    network.monitor.dispose();
    network.monitor.dispose();

    assert!(rx.changed().await.is_err());

    network.go_offline().await;
    assert!(network.monitor.current().is_online());
}

#[tokio::test]
async fn initialize_after_dispose_fails() {
    let network = Network::new(ConnectionType::Wifi, Some(FAST));
    network.monitor.dispose();

    let result = network.monitor.initialize().await;
    assert!(matches!(result, Err(Error::Disposed)));
}
