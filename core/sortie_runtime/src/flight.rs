//! Flight state machine.
//!
//! Every operation is gated on the flight state the vehicle reports at the
//! time of the call and confirmed by an event from the vehicle. The only
//! automatic reaction is the escalation of a failed landing to a motor cut.

use crate::config::FlightConfig;
use crate::fix::FixAcquisition;
use crate::link::VehicleLink;
use crate::position::{self, PositionError};
use crate::wait::{await_event, issue_and_wait, Outcome};
use log::{error, info, warn};
use sortie_payloads::{
    Action, CameraMode, Command, Expectation, FlightState, Position, RelativeMove,
};
use sortie_traits::{SortieError, SortieResult};
use std::fmt::{Display, Formatter};
use std::time::Duration;
use thiserror::Error;

const GIMBAL_PITCH_LIMIT_DEG: f64 = 90.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    TakeOff,
    Land,
    MoveRelative,
    GimbalPitch,
    CameraMode,
    Emergency,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::TakeOff => "take off",
            Operation::Land => "land",
            Operation::MoveRelative => "move",
            Operation::GimbalPitch => "set gimbal pitch",
            Operation::CameraMode => "set camera mode",
            Operation::Emergency => "cut motors",
        };
        write!(f, "{}", name)
    }
}

/// What an outcome means for the operation that produced it.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    Succeeded,
    Fail(FlightError),
    /// The failure is not acceptable as is, the motors have to be cut.
    Escalate,
}

impl Operation {
    /// Whether the operation may be attempted from `state`.
    pub fn permits(&self, state: FlightState) -> bool {
        match self {
            Operation::TakeOff => state == FlightState::Landed,
            Operation::Land => state != FlightState::Landed,
            Operation::MoveRelative => state == FlightState::Hovering,
            Operation::GimbalPitch | Operation::CameraMode | Operation::Emergency => true,
        }
    }

    pub fn resolve(&self, outcome: Outcome) -> Resolution {
        match (self, outcome) {
            (_, Outcome::Confirmed) => Resolution::Succeeded,
            (Operation::Land, _) => Resolution::Escalate,
            (Operation::MoveRelative, Outcome::TimedOut) => {
                Resolution::Fail(FlightError::MoveAbandoned)
            }
            (Operation::GimbalPitch, Outcome::Rejected) => {
                Resolution::Fail(FlightError::GimbalUnknownError)
            }
            (Operation::Emergency, _) => Resolution::Fail(FlightError::EmergencyCutFailed),
            (op, Outcome::TimedOut) => Resolution::Fail(FlightError::TimedOut(*op)),
            (op, Outcome::Rejected) => Resolution::Fail(FlightError::Rejected(*op)),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlightError {
    #[error("Cannot {operation} while {state}")]
    PreconditionNotMet {
        operation: Operation,
        state: FlightState,
    },
    #[error("Timed out waiting to {0}")]
    TimedOut(Operation),
    #[error("Vehicle refused to {0}")]
    Rejected(Operation),
    #[error("Move timed out, the vehicle may still be moving")]
    MoveAbandoned,
    #[error("Unknown gimbal error")]
    GimbalUnknownError,
    #[error("Landing ended with {cause:?}, motors were cut")]
    Escalated { cause: Outcome },
    #[error("Emergency motor cut failed")]
    EmergencyCutFailed,
    #[error("Connection error: {0}")]
    Connection(#[from] SortieError),
}

impl FlightError {
    /// Fatal errors leave the vehicle in a state nothing else should be tried from.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FlightError::Connection(_) | FlightError::EmergencyCutFailed
        )
    }
}

/// Truncates toward zero, NaN ends up level.
pub fn clamp_gimbal_pitch(angle_deg: f64) -> i16 {
    angle_deg.clamp(-GIMBAL_PITCH_LIMIT_DEG, GIMBAL_PITCH_LIMIT_DEG) as i16
}

/// Owns a connected [`VehicleLink`] and issues one command at a time on it.
///
/// The link is disconnected when the controller goes out of scope, whatever
/// happened to the flight.
pub struct FlightController<L: VehicleLink> {
    link: L,
    config: FlightConfig,
    connected: bool,
}

impl<L: VehicleLink> FlightController<L> {
    /// Connects the link and applies the gimbal speed limits.
    pub fn connect(mut link: L, config: FlightConfig) -> SortieResult<Self> {
        link.connect()?;
        let mut controller = Self {
            link,
            config,
            connected: true,
        };
        let speed = controller.config.gimbal_max_speed;
        let command = Command::new(
            Action::GimbalMaxSpeed(speed),
            controller.config.timeouts.gimbal(),
        );
        match issue_and_wait(&mut controller.link, &command, &Expectation::Accepted)? {
            Outcome::Confirmed => Ok(controller),
            outcome => Err(SortieError::from(format!(
                "Could not set the gimbal max speed: {:?}",
                outcome
            ))),
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn config(&self) -> &FlightConfig {
        &self.config
    }

    pub fn flight_state(&self) -> SortieResult<FlightState> {
        self.link.flight_state()
    }

    /// Waits for a GPS lock unless the vehicle already has one.
    pub fn acquire_fix(
        &mut self,
        max_attempts: u32,
        per_attempt_timeout: Duration,
    ) -> SortieResult<bool> {
        // Marked before the query so a fix landing in between is not missed.
        let since = self.link.mark()?;
        if self.link.gps_fixed()? {
            info!("GPS already locked");
            return Ok(true);
        }
        let link = &mut self.link;
        FixAcquisition::new(max_attempts, per_attempt_timeout)
            .run(|_, timeout| await_event(&mut *link, &Expectation::GpsFix(true), since, timeout))
    }

    pub fn validated_position(&self) -> Result<Position, PositionError> {
        position::validate(self.link.last_position()?)
    }

    pub fn takeoff(&mut self) -> Result<(), FlightError> {
        self.guard(Operation::TakeOff)?;
        info!("Taking off");
        let command = Command::new(Action::TakeOff, self.config.timeouts.takeoff());
        self.execute(
            Operation::TakeOff,
            command,
            Expectation::FlightState(FlightState::Hovering),
        )
    }

    /// A landing that is not confirmed in time, or refused, cuts the motors.
    pub fn land(&mut self) -> Result<(), FlightError> {
        self.guard(Operation::Land)?;
        info!("Landing");
        let command = Command::new(Action::Land, self.config.timeouts.land());
        self.execute(
            Operation::Land,
            command,
            Expectation::FlightState(FlightState::Landed),
        )
    }

    pub fn move_relative(&mut self, motion: RelativeMove) -> Result<(), FlightError> {
        self.guard(Operation::MoveRelative)?;
        let command = Command::new(motion.to_action(), self.config.timeouts.moving());
        info!("Moving: {}", command.action());
        self.execute(
            Operation::MoveRelative,
            command,
            Expectation::FlightState(FlightState::Hovering),
        )
    }

    /// Points the gimbal to an absolute pitch, clamped to [-90, 90] degrees.
    pub fn gimbal_pitch(&mut self, angle_deg: f64) -> Result<(), FlightError> {
        let degrees = clamp_gimbal_pitch(angle_deg);
        let command = Command::new(
            Action::GimbalSetPitch { degrees },
            self.config.timeouts.gimbal(),
        );
        self.execute(
            Operation::GimbalPitch,
            command,
            Expectation::GimbalPitch(degrees),
        )
    }

    pub fn configure_camera(&mut self, mode: CameraMode) -> Result<(), FlightError> {
        let command = Command::new(Action::SetCameraMode(mode), self.config.timeouts.camera());
        self.execute(Operation::CameraMode, command, Expectation::CameraMode(mode))
    }

    /// Cuts the motors wherever the vehicle is.
    pub fn emergency(&mut self) -> Result<(), FlightError> {
        warn!("Cutting motors");
        let command = Command::new(Action::Emergency, self.config.timeouts.emergency());
        self.execute(Operation::Emergency, command, Expectation::Accepted)
    }

    /// Disconnects now instead of on drop, reporting a failure.
    pub fn close(mut self) -> SortieResult<()> {
        self.connected = false;
        self.link.disconnect()
    }

    fn guard(&self, operation: Operation) -> Result<(), FlightError> {
        let state = self.link.flight_state()?;
        if operation.permits(state) {
            return Ok(());
        }
        match operation {
            Operation::TakeOff if state.is_airborne() => warn!("Already flying"),
            Operation::Land => warn!("Already landed"),
            Operation::MoveRelative => warn!("Must be hovering to initiate move"),
            _ => warn!("Cannot {} while {}", operation, state),
        }
        Err(FlightError::PreconditionNotMet { operation, state })
    }

    fn execute(
        &mut self,
        operation: Operation,
        command: Command,
        expected: Expectation,
    ) -> Result<(), FlightError> {
        let outcome = issue_and_wait(&mut self.link, &command, &expected)?;
        match operation.resolve(outcome) {
            Resolution::Succeeded => Ok(()),
            Resolution::Fail(err) => {
                if err.is_fatal() {
                    error!("{}", err);
                } else {
                    warn!("{}", err);
                }
                Err(err)
            }
            Resolution::Escalate => {
                error!("Failed to {} ({:?}), escalating", operation, outcome);
                self.emergency()?;
                Err(FlightError::Escalated { cause: outcome })
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}

impl<L: VehicleLink> Drop for FlightController<L> {
    fn drop(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        if let Err(e) = self.link.disconnect() {
            error!("Failed to disconnect from the vehicle: {}", e);
        }
    }
}
