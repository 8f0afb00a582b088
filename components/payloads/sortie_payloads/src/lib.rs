//! Data exchanged between the flight orchestration core and a vehicle.
//!
//! [`Action`]s go up to the vehicle, [`VehicleEvent`]s come back down. A
//! [`Command`] pairs an action with the deadline its confirmation is awaited
//! for, and an [`Expectation`] is the predicate over events that confirms it.

mod motion;
mod position;

pub use motion::RelativeMove;
pub use position::Position;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Discrete flight phase of the vehicle, as reported by the vehicle itself.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode,
)]
pub enum FlightState {
    #[default]
    Landed,
    TakingOff,
    Hovering,
    Landing,
    Emergency,
}

impl FlightState {
    /// True for every state where the motors may be spinning.
    pub fn is_airborne(&self) -> bool {
        matches!(
            self,
            FlightState::TakingOff | FlightState::Hovering | FlightState::Landing
        )
    }
}

impl Display for FlightState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FlightState::Landed => "landed",
            FlightState::TakingOff => "taking off",
            FlightState::Hovering => "hovering",
            FlightState::Landing => "landing",
            FlightState::Emergency => "emergency",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum CameraMode {
    #[default]
    Photo,
    Recording,
}

/// Maximum gimbal speeds in degrees per second.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct GimbalSpeed {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Default for GimbalSpeed {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 180.0,
            roll: 90.0,
        }
    }
}

/// What the vehicle is asked to do.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub enum Action {
    TakeOff,
    Land,
    /// Body frame displacement: metres forward, right and down, radians of yaw (clockwise).
    MoveBy { dx: f32, dy: f32, dz: f32, dpsi: f32 },
    /// Absolute gimbal pitch in whole degrees, already within [-90, 90].
    GimbalSetPitch { degrees: i16 },
    /// Cuts the motors wherever the vehicle is.
    Emergency,
    GimbalMaxSpeed(GimbalSpeed),
    SetCameraMode(CameraMode),
}

/// Payload-free tag of an [`Action`], handy to key faults or statistics on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    TakeOff,
    Land,
    MoveBy,
    GimbalSetPitch,
    Emergency,
    GimbalMaxSpeed,
    SetCameraMode,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::TakeOff => ActionKind::TakeOff,
            Action::Land => ActionKind::Land,
            Action::MoveBy { .. } => ActionKind::MoveBy,
            Action::GimbalSetPitch { .. } => ActionKind::GimbalSetPitch,
            Action::Emergency => ActionKind::Emergency,
            Action::GimbalMaxSpeed(_) => ActionKind::GimbalMaxSpeed,
            Action::SetCameraMode(_) => ActionKind::SetCameraMode,
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::TakeOff => write!(f, "TakeOff"),
            Action::Land => write!(f, "Landing"),
            Action::MoveBy { dx, dy, dz, dpsi } => {
                write!(f, "moveBy({:.2}, {:.2}, {:.2}, {:.3})", dx, dy, dz, dpsi)
            }
            Action::GimbalSetPitch { degrees } => write!(f, "gimbal.set_target(pitch={})", degrees),
            Action::Emergency => write!(f, "Emergency"),
            Action::GimbalMaxSpeed(speed) => write!(
                f,
                "gimbal.set_max_speed(yaw={}, pitch={}, roll={})",
                speed.yaw, speed.pitch, speed.roll
            ),
            Action::SetCameraMode(mode) => write!(f, "camera.set_camera_mode({:?})", mode),
        }
    }
}

/// An action together with how long its confirmation may be awaited.
/// Immutable once built.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Command {
    action: Action,
    deadline: Duration,
}

impl Command {
    pub fn new(action: Action, deadline: Duration) -> Self {
        Self { action, deadline }
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (deadline {:?})", self.action, self.deadline)
    }
}

/// Notifications pushed by the vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub enum VehicleEvent {
    FlightStateChanged(FlightState),
    GpsFixChanged(bool),
    PositionChanged(Position),
    GimbalAttitude { pitch: i16 },
    CameraModeChanged(CameraMode),
}

/// The post-condition a command waits for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expectation {
    FlightState(FlightState),
    GpsFix(bool),
    GimbalPitch(i16),
    CameraMode(CameraMode),
    /// Fire and confirm: the vehicle accepting the command is the confirmation.
    Accepted,
}

impl Expectation {
    pub fn matches(&self, event: &VehicleEvent) -> bool {
        match (self, event) {
            (Expectation::FlightState(want), VehicleEvent::FlightStateChanged(got)) => want == got,
            (Expectation::GpsFix(want), VehicleEvent::GpsFixChanged(got)) => want == got,
            (Expectation::GimbalPitch(want), VehicleEvent::GimbalAttitude { pitch }) => {
                want == pitch
            }
            (Expectation::CameraMode(want), VehicleEvent::CameraModeChanged(got)) => want == got,
            _ => false,
        }
    }
}

impl Display for Expectation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expectation::FlightState(state) => write!(f, "FlyingStateChanged(state={})", state),
            Expectation::GpsFix(fixed) => write!(f, "GPSFixStateChanged(fixed={})", fixed),
            Expectation::GimbalPitch(pitch) => write!(f, "gimbal.attitude(pitch={})", pitch),
            Expectation::CameraMode(mode) => write!(f, "camera.mode({:?})", mode),
            Expectation::Accepted => write!(f, "ack"),
        }
    }
}
