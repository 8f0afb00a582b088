use approx::assert_relative_eq;
use sortie_payloads::{Action, ActionKind, CameraMode, FlightState, Position, RelativeMove};
use sortie_runtime::prelude::*;
use sortie_sim_vehicle::{geo, SimFault, SimSettings, SimVehicle};
use std::thread;
use std::time::{Duration, Instant};
use uom::si::angle::degree;
use uom::si::f64::{Angle, Length};
use uom::si::length::meter;

fn test_config() -> FlightConfig {
    let mut config = FlightConfig::default();
    config.timeouts = Timeouts {
        takeoff_ms: 1_000,
        land_ms: 1_000,
        move_ms: 1_000,
        gimbal_ms: 1_000,
        camera_ms: 1_000,
        emergency_ms: 1_000,
    };
    config
}

fn fly(settings: SimSettings, config: FlightConfig) -> FlightController<SimVehicle> {
    FlightController::connect(SimVehicle::new("anafi-test", settings), config)
        .expect("Failed to connect to the simulated vehicle")
}

fn sent_kinds(controller: &FlightController<SimVehicle>) -> Vec<ActionKind> {
    controller
        .link()
        .sent_actions()
        .iter()
        .map(Action::kind)
        .collect()
}

#[test]
fn takeoff_move_and_land() {
    let mut controller = fly(SimSettings::fast(), test_config());
    assert!(controller.acquire_fix(1, Duration::from_secs(1)).unwrap());
    let home = controller.validated_position().unwrap();
    assert_eq!(home, SimSettings::fast().home);

    controller.takeoff().unwrap();
    assert_eq!(controller.flight_state().unwrap(), FlightState::Hovering);

    controller
        .move_relative(RelativeMove::new().forward(Length::new::<meter>(40.0)))
        .unwrap();
    assert_eq!(controller.flight_state().unwrap(), FlightState::Hovering);
    let moved = controller.validated_position().unwrap();
    assert!(moved.latitude() > home.latitude());

    controller.land().unwrap();
    assert_eq!(controller.flight_state().unwrap(), FlightState::Landed);
    assert!(!sent_kinds(&controller).contains(&ActionKind::Emergency));
    controller.close().unwrap();
}

#[test]
fn stalled_landing_cuts_the_motors() {
    let settings = SimSettings::fast().with_fault(SimFault::Stall(ActionKind::Land));
    let mut config = test_config();
    config.timeouts.land_ms = 100;
    let mut controller = fly(settings, config);

    controller.takeoff().unwrap();
    let err = controller.land().unwrap_err();
    assert_eq!(
        err,
        FlightError::Escalated {
            cause: Outcome::TimedOut
        }
    );
    assert_eq!(controller.flight_state().unwrap(), FlightState::Emergency);
    assert_eq!(
        sent_kinds(&controller),
        vec![
            ActionKind::GimbalMaxSpeed,
            ActionKind::TakeOff,
            ActionKind::Land,
            ActionKind::Emergency
        ]
    );
}

#[test]
fn refused_takeoff_is_reported() {
    let settings = SimSettings::fast().with_fault(SimFault::Refuse(ActionKind::TakeOff));
    let mut controller = fly(settings, test_config());
    assert_eq!(
        controller.takeoff(),
        Err(FlightError::Rejected(Operation::TakeOff))
    );
    assert_eq!(controller.flight_state().unwrap(), FlightState::Landed);
}

#[test]
fn no_fix_gives_up() {
    let settings = SimSettings::fast().with_fault(SimFault::NoFix);
    let mut controller = fly(settings, test_config());
    assert!(!controller.acquire_fix(2, Duration::from_millis(50)).unwrap());
    assert_eq!(controller.validated_position(), Err(PositionError::NoFix));
}

#[test]
fn glitching_position_is_rejected() {
    let glitch = Position::from_degrees(91.0, 2.0, 0.0);
    let settings = SimSettings::fast().with_fault(SimFault::PositionGlitch(glitch));
    let mut controller = fly(settings, test_config());
    assert!(controller.acquire_fix(1, Duration::from_secs(1)).unwrap());
    match controller.validated_position() {
        Err(PositionError::OutOfBounds { field, .. }) => {
            assert_eq!(field, PositionField::Latitude)
        }
        other => panic!("expected an out of bounds latitude, got {:?}", other),
    }
}

#[test]
fn move_needs_hovering() {
    let mut controller = fly(SimSettings::fast(), test_config());
    let motion = RelativeMove::new().yaw(Angle::new::<degree>(-30.0));
    assert!(matches!(
        controller.move_relative(motion),
        Err(FlightError::PreconditionNotMet {
            operation: Operation::MoveRelative,
            state: FlightState::Landed
        })
    ));
    assert_eq!(sent_kinds(&controller), vec![ActionKind::GimbalMaxSpeed]);
}

#[test]
fn gimbal_and_camera() {
    let mut controller = fly(SimSettings::fast(), test_config());
    controller.gimbal_pitch(120.0).unwrap();
    controller.configure_camera(CameraMode::Recording).unwrap();
    let telemetry = controller.link().telemetry().unwrap();
    assert_eq!(telemetry.gimbal_pitch, 90);
    assert_eq!(telemetry.camera_mode, CameraMode::Recording);
}

#[test]
fn stalled_gimbal_times_out() {
    let settings = SimSettings::fast().with_fault(SimFault::Stall(ActionKind::GimbalSetPitch));
    let mut config = test_config();
    config.timeouts.gimbal_ms = 50;
    let mut controller = fly(settings, config);
    assert_eq!(
        controller.gimbal_pitch(-45.0),
        Err(FlightError::TimedOut(Operation::GimbalPitch))
    );
}

#[test]
fn dropped_link_is_fatal() {
    let settings = SimSettings::fast().with_fault(SimFault::DropLinkOn(ActionKind::MoveBy));
    let mut controller = fly(settings, test_config());
    controller.takeoff().unwrap();
    let err = controller
        .move_relative(RelativeMove::new().right(Length::new::<meter>(5.0)))
        .unwrap_err();
    assert!(matches!(err, FlightError::Connection(_)));
    assert!(err.is_fatal());
    assert!(controller.flight_state().is_err());
}

#[test]
fn unconnected_vehicle_refuses_everything() {
    let mut vehicle = SimVehicle::new("idle", SimSettings::fast());
    assert!(vehicle.flight_state().is_err());
    assert!(vehicle.mark().is_err());
    assert!(vehicle.disconnect().is_ok());
    vehicle.connect().unwrap();
    assert!(vehicle.connect().is_err());
    vehicle.disconnect().unwrap();
    assert!(!vehicle.is_connected());
    assert!(vehicle.gps_fixed().is_err());
}

#[test]
fn position_is_known_once_the_fix_is() {
    for _ in 0..20 {
        let mut controller = fly(SimSettings::fast(), test_config());
        assert!(controller.acquire_fix(1, Duration::from_secs(1)).unwrap());
        assert_eq!(
            controller.validated_position(),
            Ok(SimSettings::fast().home)
        );
    }
}

#[test]
fn abandoned_move_is_not_confirmed_by_the_next_one() {
    let settings = SimSettings {
        move_latency: Duration::from_millis(300),
        ..SimSettings::fast()
    };
    let mut config = test_config();
    config.timeouts.move_ms = 150;
    let mut controller = fly(settings, config);
    assert!(controller.acquire_fix(1, Duration::from_secs(1)).unwrap());
    controller.takeoff().unwrap();
    let lifted = controller.validated_position().unwrap();

    let turn_and_go = RelativeMove::new()
        .forward(Length::new::<meter>(40.0))
        .yaw(Angle::new::<degree>(90.0));
    assert_eq!(
        controller.move_relative(turn_and_go),
        Err(FlightError::MoveAbandoned)
    );
    let started = Instant::now();
    assert_eq!(
        controller.move_relative(RelativeMove::new().forward(Length::new::<meter>(40.0))),
        Err(FlightError::MoveAbandoned)
    );
    assert!(started.elapsed() >= Duration::from_millis(150));

    // Only the second move lands, along the heading the first one never reached.
    thread::sleep(Duration::from_millis(400));
    assert_eq!(controller.flight_state().unwrap(), FlightState::Hovering);
    let reached = controller.validated_position().unwrap();
    let expected = geo::displace(lifted, Angle::new::<degree>(0.0), 40.0, 0.0, 0.0);
    assert_relative_eq!(
        reached.latitude().get::<degree>(),
        expected.latitude().get::<degree>(),
        epsilon = 1e-9
    );
    assert_relative_eq!(
        reached.longitude().get::<degree>(),
        expected.longitude().get::<degree>(),
        epsilon = 1e-9
    );
}

#[test]
fn slow_answer_to_the_motor_cut_breaks_the_link() {
    let settings = SimSettings {
        ack_latency: Duration::from_millis(200),
        ..SimSettings::fast()
    };
    let mut controller = fly(settings.clone(), test_config());
    controller.emergency().unwrap();

    let mut config = test_config();
    config.timeouts.emergency_ms = 50;
    let mut controller = fly(settings, config);
    let err = controller.emergency().unwrap_err();
    assert!(matches!(err, FlightError::Connection(_)));
    assert!(controller.flight_state().is_err());
}
