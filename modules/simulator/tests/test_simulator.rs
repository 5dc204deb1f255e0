// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use chrono::{DateTime, Utc};
use common::{channel::Channel, position::Position, sample::TelemetrySample};
use module_core::{
    EventBus, EventKind, EventKindType, Module, payload_ref,
    test_helper::{stop_module, wait_for_event},
};
use rand::{SeedableRng, rngs::StdRng};
use simulator::{PathWalker, SimulatorConfig, SimulatorModule, TelemetryGenerator};
use std::time::Duration;

fn path() -> Vec<Position> {
    vec![
        Position::new(&52.026649, &11.282535),
        Position::new(&52.026751, &11.282047),
        Position::new(&52.026807, &11.281746),
    ]
}

fn generator(config: &SimulatorConfig) -> TelemetryGenerator<StdRng> {
    TelemetryGenerator::new_with_rng(config, StdRng::seed_from_u64(7), DateTime::<Utc>::default())
        .unwrap()
}

#[test]
fn records_are_valid_samples() {
    let mut generator = generator(&SimulatorConfig::default());

    for _ in 0..100 {
        let sample = TelemetrySample::from_record(&generator.next_record());
        let speed = sample.value(Channel::Speed).unwrap();
        let rpm = sample.value(Channel::Rpm).unwrap();
        assert!((0.0..=60.0).contains(&speed));
        assert!((rpm - speed * 120.0).abs() <= 200.01);
        assert!(sample.value(Channel::EngineTemp).is_some());
        assert!(sample.value(Channel::GyroZ).is_some());
        assert!(sample.position().is_some());
    }
}

#[test]
fn timestamps_advance_by_interval() {
    let mut generator = generator(&SimulatorConfig::default());

    let first = TelemetrySample::from_record(&generator.next_record());
    let second = TelemetrySample::from_record(&generator.next_record());

    assert_eq!(first.timestamp(), Some(500.0));
    assert_eq!(second.timestamp(), Some(1000.0));
}

#[test]
fn follows_configured_path() {
    let config = SimulatorConfig {
        interval: Duration::from_millis(500),
        path: Some(path()),
    };
    let mut generator = generator(&config);

    for _ in 0..50 {
        let pos = TelemetrySample::from_record(&generator.next_record())
            .position()
            .unwrap();
        assert!((pos.latitude - 52.0267).abs() < 0.001, "{pos:?}");
        assert!((pos.longitude - 11.282).abs() < 0.001, "{pos:?}");
    }
}

#[test]
fn walker_interpolates_and_wraps() {
    let mut walker = PathWalker::new(&path()).unwrap();

    let start = walker.position().unwrap();
    assert!((start.latitude - 52.026649).abs() < 1e-6);
    assert!((start.longitude - 11.282535).abs() < 1e-6);

    let moved = walker.advance(10.0).unwrap();
    assert!(moved.longitude < start.longitude);

    let wrapped = walker.advance(10_000.0).unwrap();
    assert!((wrapped.latitude - 52.0267).abs() < 0.001);
}

#[test]
fn single_point_path_stays() {
    let mut walker = PathWalker::new(&[Position::new(&52.0, &11.0)]).unwrap();

    let pos = walker.advance(25.0).unwrap();

    assert!((pos.latitude - 52.0).abs() < 1e-6);
    assert!((pos.longitude - 11.0).abs() < 1e-6);
}

#[test]
fn report_creation_error_with_empty_path() {
    let eb = EventBus::default();
    let config = SimulatorConfig {
        interval: Duration::from_millis(100),
        path: Some(vec![]),
    };

    assert!(SimulatorModule::new(eb.context(), config).is_err());
    assert!(
        SimulatorModule::new(
            eb.context(),
            SimulatorConfig {
                interval: Duration::ZERO,
                path: None
            }
        )
        .is_err()
    );
}

#[tokio::test]
#[test_log::test]
async fn publishes_records() {
    let eb = EventBus::default();
    let mut rx = eb.subscribe();
    let simulator = SimulatorModule::new(
        eb.context(),
        SimulatorConfig {
            interval: Duration::from_millis(10),
            path: Some(path()),
        },
    )
    .unwrap();
    let mut module = tokio::spawn(async move {
        let mut simulator = simulator;
        simulator.run().await
    });

    wait_for_event(&mut rx, Duration::from_millis(200), EventKindType::ConnectedEvent).await;
    let event = wait_for_event(
        &mut rx,
        Duration::from_millis(200),
        EventKindType::TelemetryRecordEvent,
    )
    .await;
    let record = payload_ref!(event.kind, EventKind::TelemetryRecordEvent).unwrap();
    assert!(record.contains_key("vel"));
    assert!(record.contains_key("timestamp"));

    stop_module(&eb, &mut module).await;
}
