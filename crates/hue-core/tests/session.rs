//! Session tests against the mock bulb.
//!
//! These run the full connect, discover, execute cycle through the
//! supervisor without BLE hardware.

use std::sync::Arc;
use std::time::Duration;

use hue_core::{
    Action, ActionReport, CharacteristicFlags, DecodedText, Error, Gamut, MockBulb, Reading, Role,
    SessionOutcome, SessionState, Supervisor, SupervisorConfig, XyPoint, uuids,
};
use hue_types::codec::encode_color_xy;
use hue_types::color::rgb_to_xy;

async fn run(bulb: &Arc<MockBulb>, action: Action) -> SessionOutcome {
    Supervisor::default().run(bulb.clone(), action).await
}

fn report(outcome: SessionOutcome) -> ActionReport {
    match outcome {
        SessionOutcome::Completed(report) => report,
        other => panic!("expected completion, got {:?}", other),
    }
}

fn failure(outcome: SessionOutcome) -> Error {
    match outcome {
        SessionOutcome::Failed(e) => e,
        other => panic!("expected failure, got {:?}", other),
    }
}

// ==================== Switch ====================

#[tokio::test]
async fn test_toggle_off_writes_on() {
    let bulb = Arc::new(MockBulb::standard_hue().with_switch(false).build());
    let outcome = run(&bulb, Action::Toggle).await;

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(
        report(outcome),
        ActionReport::Switch {
            was_on: false,
            is_on: true
        }
    );
    assert_eq!(bulb.writes().await, vec![(uuids::LIGHT_SWITCH, vec![0x01])]);
    assert_eq!(bulb.disconnect_count(), 1);
}

#[tokio::test]
async fn test_toggle_on_writes_off() {
    let bulb = Arc::new(MockBulb::standard_hue().with_switch(true).build());
    run(&bulb, Action::Toggle).await;
    assert_eq!(bulb.writes().await, vec![(uuids::LIGHT_SWITCH, vec![0x00])]);
}

#[tokio::test]
async fn test_toggle_treats_other_values_as_off() {
    let bulb = Arc::new(
        MockBulb::standard_hue()
            .with_value(uuids::LIGHT_SWITCH, vec![0x02])
            .build(),
    );
    run(&bulb, Action::Toggle).await;
    assert_eq!(bulb.writes().await, vec![(uuids::LIGHT_SWITCH, vec![0x01])]);
}

#[tokio::test]
async fn test_switch_on_and_off_read_first() {
    let bulb = Arc::new(MockBulb::standard_hue().with_switch(true).build());
    let outcome = run(&bulb, Action::SwitchOn).await;
    assert_eq!(
        report(outcome),
        ActionReport::Switch {
            was_on: true,
            is_on: true
        }
    );
    // The model is read once on the way to Ready, then the switch
    assert_eq!(bulb.reads().await, vec![uuids::MODEL_NUMBER, uuids::LIGHT_SWITCH]);

    let outcome = run(&bulb, Action::SwitchOff).await;
    assert!(outcome.is_completed());
    assert_eq!(
        bulb.writes().await,
        vec![
            (uuids::LIGHT_SWITCH, vec![0x01]),
            (uuids::LIGHT_SWITCH, vec![0x00])
        ]
    );
}

#[tokio::test]
async fn test_unreadable_switch_is_device_unreachable() {
    let bulb = Arc::new(
        MockBulb::standard_hue()
            .unreadable(Role::LightSwitch)
            .build(),
    );
    let outcome = run(&bulb, Action::Toggle).await;
    assert_eq!(outcome.exit_code(), 1);

    let err = failure(outcome);
    assert!(matches!(
        err,
        Error::DeviceUnreachable {
            role: Role::LightSwitch
        }
    ));
    assert!(err.to_string().contains("firmware reset"));
    assert_eq!(bulb.write_count(), 0);
}

#[tokio::test]
async fn test_empty_switch_value_is_device_unreachable() {
    let bulb = Arc::new(
        MockBulb::standard_hue()
            .with_value(uuids::LIGHT_SWITCH, Vec::new())
            .build(),
    );
    let err = failure(run(&bulb, Action::SwitchOn).await);
    assert!(matches!(err, Error::DeviceUnreachable { .. }));
    assert_eq!(bulb.write_count(), 0);
}

// ==================== Unbound roles ====================

#[tokio::test]
async fn test_unbound_role_fails_without_touching_it() {
    let bulb = Arc::new(
        MockBulb::standard_hue()
            .without_role(Role::Brightness)
            .build(),
    );
    let outcome = run(&bulb, Action::Brightness(10)).await;
    assert_eq!(outcome.exit_code(), 1);
    assert!(matches!(
        failure(outcome),
        Error::RoleNotBound {
            role: Role::Brightness
        }
    ));
    assert_eq!(bulb.reads().await, vec![uuids::MODEL_NUMBER]);
    assert_eq!(bulb.write_count(), 0);
}

#[tokio::test]
async fn test_unbound_color_fails_without_writing() {
    let bulb = Arc::new(MockBulb::standard_hue().without_role(Role::Color).build());
    let outcome = run(
        &bulb,
        Action::Color {
            red: 255.0,
            green: 0.0,
            blue: 0.0,
        },
    )
    .await;
    assert!(matches!(
        failure(outcome),
        Error::RoleNotBound { role: Role::Color }
    ));
    assert_eq!(bulb.reads().await, vec![uuids::MODEL_NUMBER]);
    assert_eq!(bulb.write_count(), 0);
}

#[tokio::test]
async fn test_state_requires_composite_state() {
    let bulb = Arc::new(
        MockBulb::standard_hue()
            .without_role(Role::CompositeState)
            .build(),
    );
    let err = failure(run(&bulb, Action::State).await);
    assert!(matches!(
        err,
        Error::RoleNotBound {
            role: Role::CompositeState
        }
    ));
}

// ==================== Writes with read-back ====================

#[tokio::test]
async fn test_brightness_writes_raw_level() {
    let bulb = Arc::new(MockBulb::standard_hue().build());
    let outcome = run(&bulb, Action::Brightness(128)).await;
    assert_eq!(
        report(outcome),
        ActionReport::Brightness {
            written: 128,
            read_back: Reading::Value(128)
        }
    );
    assert_eq!(bulb.writes().await, vec![(uuids::BRIGHTNESS, vec![128])]);
}

#[tokio::test]
async fn test_unreadable_read_back_still_completes() {
    let bulb = Arc::new(
        MockBulb::standard_hue()
            .unreadable(Role::Brightness)
            .build(),
    );
    let outcome = run(&bulb, Action::Brightness(1)).await;
    assert_eq!(
        report(outcome),
        ActionReport::Brightness {
            written: 1,
            read_back: Reading::Unreadable
        }
    );
}

#[tokio::test]
async fn test_temperature_is_clamped() {
    let bulb = Arc::new(MockBulb::standard_hue().build());
    let outcome = run(&bulb, Action::Temperature(1000)).await;
    assert_eq!(
        report(outcome),
        ActionReport::Temperature {
            requested: 1000,
            written: 454,
            read_back: Reading::Value(454)
        }
    );
    assert_eq!(bulb.writes().await, vec![(uuids::TEMPERATURE, vec![0xC6, 0x01])]);

    run(&bulb, Action::Temperature(0)).await;
    assert_eq!(
        bulb.value(&uuids::TEMPERATURE).await,
        Some(vec![0x99, 0x00])
    );
}

#[tokio::test]
async fn test_col_xy_encoding() {
    let bulb = Arc::new(MockBulb::standard_hue().build());
    let outcome = run(&bulb, Action::ColorXy { x: 0.5, y: 0.25 }).await;

    let ActionReport::ColorXy { written, read_back } = report(outcome) else {
        panic!("expected col_xy report");
    };
    assert_eq!(written, XyPoint::new(0.5, 0.25));
    let read_back = *read_back.value().expect("read back");
    assert!((read_back.x - 0.5).abs() <= 1.0 / 65535.0);
    assert!((read_back.y - 0.25).abs() <= 1.0 / 65535.0);
    assert_eq!(
        bulb.writes().await,
        vec![(uuids::COLOR, encode_color_xy(0.5, 0.25).to_vec())]
    );
}

#[tokio::test]
async fn test_color_uses_model_gamut() {
    let bulb = Arc::new(MockBulb::standard_hue().with_model("LCT001").build());
    let outcome = run(
        &bulb,
        Action::Color {
            red: 255.0,
            green: 0.0,
            blue: 0.0,
        },
    )
    .await;

    let ActionReport::Color {
        gamut,
        gamut_fallback,
        written,
        ..
    } = report(outcome)
    else {
        panic!("expected color report");
    };
    assert_eq!(gamut, Gamut::B);
    assert!(!gamut_fallback);
    assert_eq!(written, rgb_to_xy(255.0, 0.0, 0.0, Gamut::B));
    assert_eq!(
        bulb.writes().await,
        vec![(uuids::COLOR, encode_color_xy(written.x, written.y).to_vec())]
    );
}

#[tokio::test]
async fn test_color_falls_back_to_gamut_c() {
    let bulb = Arc::new(MockBulb::standard_hue().with_model("Mystery").build());
    let outcome = run(
        &bulb,
        Action::Color {
            red: 0.0,
            green: 0.0,
            blue: 255.0,
        },
    )
    .await;
    let ActionReport::Color {
        gamut,
        gamut_fallback,
        ..
    } = report(outcome)
    else {
        panic!("expected color report");
    };
    assert_eq!(gamut, Gamut::C);
    assert!(gamut_fallback);
}

#[tokio::test]
async fn test_color_without_model_uses_default_gamut() {
    let bulb = Arc::new(MockBulb::standard_hue().without_role(Role::Model).build());
    let outcome = run(
        &bulb,
        Action::Color {
            red: 0.0,
            green: 255.0,
            blue: 0.0,
        },
    )
    .await;
    let report = report(outcome);
    assert!(report.to_string().contains("in Gamut C (default)"));
    let ActionReport::Color {
        gamut_fallback,
        written,
        ..
    } = report
    else {
        panic!("expected color report");
    };
    assert!(gamut_fallback);
    assert_eq!(written, rgb_to_xy(0.0, 255.0, 0.0, Gamut::C));
    assert_eq!(bulb.reads().await, vec![uuids::COLOR]);
}

#[tokio::test]
async fn test_color_uses_model_read_at_ready() {
    let bulb = Arc::new(MockBulb::standard_hue().with_model("LCT001").build());
    run(
        &bulb,
        Action::Color {
            red: 255.0,
            green: 255.0,
            blue: 255.0,
        },
    )
    .await;

    let reads = bulb.reads().await;
    assert_eq!(reads.iter().filter(|u| **u == uuids::MODEL_NUMBER).count(), 1);
    assert_eq!(reads.first(), Some(&uuids::MODEL_NUMBER));
}

// ==================== Reporting ====================

#[tokio::test]
async fn test_state_report() {
    let bulb = Arc::new(
        MockBulb::standard_hue()
            .with_value(uuids::COMPOSITE_STATE, vec![0, 0, 1, 0, 0, 255])
            .build(),
    );
    let outcome = run(&bulb, Action::State).await;
    let report = report(outcome);

    let ActionReport::State {
        manufacturer,
        model,
        firmware,
        state,
    } = &report
    else {
        panic!("expected state report");
    };
    assert_eq!(
        manufacturer,
        &Reading::Value(DecodedText::Text("Signify Netherlands B.V.".into()))
    );
    assert_eq!(model, &Reading::Value(DecodedText::Text("LCA001".into())));
    assert_eq!(firmware, &Reading::Value(DecodedText::Text("1.104.2".into())));
    let state = state.value().expect("decoded state");
    assert!(state.on);
    assert_eq!(state.brightness_percent, 100);

    assert!(report.to_string().contains("State: ON at 100%"));
    assert_eq!(bulb.write_count(), 0);
    let reads = bulb.reads().await;
    assert_eq!(reads.iter().filter(|u| **u == uuids::MODEL_NUMBER).count(), 1);
}

#[tokio::test]
async fn test_state_with_malformed_payload_reports_raw_bytes() {
    let bulb = Arc::new(
        MockBulb::standard_hue()
            .with_value(uuids::COMPOSITE_STATE, vec![0x01, 0x02])
            .build(),
    );
    let outcome = run(&bulb, Action::State).await;
    let ActionReport::State { state, .. } = report(outcome) else {
        panic!("expected state report");
    };
    assert_eq!(state, Reading::Raw(vec![0x01, 0x02]));
}

#[tokio::test]
async fn test_introspect_lists_everything() {
    let write_only = uuid::uuid!("932c32bd-0008-47a2-835a-a8d455b859dd");
    let bulb = Arc::new(
        MockBulb::standard_hue()
            .with_value(uuids::FIRMWARE_REVISION, vec![0xFF, 0xFE])
            .with_characteristic(
                uuids::LIGHT_CONTROL_SERVICE,
                write_only,
                CharacteristicFlags {
                    read: false,
                    write: true,
                    notify: false,
                },
                Some(b"ok".to_vec()),
            )
            .build(),
    );
    let outcome = run(&bulb, Action::Introspect).await;
    let ActionReport::Introspect { services } = report(outcome) else {
        panic!("expected introspect report");
    };

    assert_eq!(services.len(), 2);
    let characteristics: Vec<_> = services.iter().flat_map(|s| &s.characteristics).collect();
    assert_eq!(characteristics.len(), 10);
    assert!(characteristics.iter().any(|c| c.role == Role::Unknown));

    let firmware = characteristics
        .iter()
        .find(|c| c.role == Role::Firmware)
        .expect("firmware listed");
    assert_eq!(
        firmware.value,
        Reading::Value(DecodedText::Raw(vec![0xFF, 0xFE]))
    );

    // Characteristics are read whatever their advertised flags
    let unflagged = characteristics
        .iter()
        .find(|c| c.uuid == write_only)
        .expect("write-only characteristic listed");
    assert!(!unflagged.flags.read);
    assert_eq!(unflagged.value, Reading::Value(DecodedText::Text("ok".into())));
    assert_eq!(bulb.write_count(), 0);
}

// ==================== Lifecycle ====================

#[tokio::test]
async fn test_connect_failure() {
    let bulb = Arc::new(MockBulb::standard_hue().fail_connect().build());
    let outcome = run(&bulb, Action::Toggle).await;
    assert_eq!(outcome.exit_code(), 1);
    assert!(matches!(failure(outcome), Error::ConnectionFailed { .. }));
    assert_eq!(bulb.io_count(), 0);
}

#[tokio::test]
async fn test_discovery_failure_is_connection_failed() {
    let bulb = Arc::new(MockBulb::standard_hue().fail_discovery().build());
    let err = failure(run(&bulb, Action::Toggle).await);
    assert!(matches!(err, Error::ConnectionFailed { .. }));
    assert_eq!(bulb.disconnect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hung_discovery_times_out_within_bound() {
    let bulb = Arc::new(MockBulb::standard_hue().hang_discovery().build());
    let supervisor = Supervisor::new(SupervisorConfig::new().timeout(Duration::from_secs(10)));

    let started = tokio::time::Instant::now();
    let outcome = supervisor.run(bulb.clone(), Action::Toggle).await;
    let elapsed = started.elapsed();

    assert!(matches!(
        outcome,
        SessionOutcome::TimedOut {
            last_state: SessionState::ServicesResolving,
            ..
        }
    ));
    assert_ne!(outcome.exit_code(), 0);
    assert!(elapsed >= Duration::from_secs(10));
    assert!(elapsed < Duration::from_secs(11));
}

#[tokio::test]
async fn test_unknown_action_never_reaches_the_device() {
    let bulb = Arc::new(MockBulb::standard_hue().build());
    let err = Action::parse("foobar", &[]).unwrap_err();
    let outcome = SessionOutcome::Failed(err);
    assert_eq!(outcome.exit_code(), 2);
    assert_eq!(bulb.connect_count(), 0);
    assert_eq!(bulb.io_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_disconnect_still_reports_completion() {
    let bulb = Arc::new(
        MockBulb::standard_hue()
            .with_switch(true)
            .hang_disconnect()
            .build(),
    );
    let supervisor = Supervisor::new(SupervisorConfig::new().timeout(Duration::from_secs(3)));
    let outcome = supervisor.run(bulb.clone(), Action::Toggle).await;

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(
        report(outcome),
        ActionReport::Switch {
            was_on: true,
            is_on: false
        }
    );
    assert_eq!(bulb.writes().await, vec![(uuids::LIGHT_SWITCH, vec![0x00])]);
}
