use crate::mission::{Mission, Step};
use log::{error, info, warn};
use sortie_payloads::{FlightState, Position};
use sortie_runtime::flight::{FlightController, FlightError};
use sortie_runtime::link::VehicleLink;
use sortie_runtime::position::PositionError;
use sortie_traits::SortieResult;
use std::thread;
use std::time::Duration;

#[derive(Clone, Debug, Default)]
pub struct DriverOptions {
    /// Wait for the operator before taking off, even if the mission does not ask for it.
    pub interactive: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StepResult {
    Done,
    Failed(FlightError),
    /// Not attempted, the vehicle was no longer hovering.
    Skipped,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepReport {
    pub index: usize,
    pub step: Step,
    pub result: StepResult,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MissionReport {
    pub fix_acquired: bool,
    pub position: Option<Position>,
    pub took_off: bool,
    pub steps: Vec<StepReport>,
    /// `None` when there was nothing to land.
    pub landing: Option<Result<(), FlightError>>,
    /// The fatal error that ended the flight early.
    pub aborted: Option<FlightError>,
    pub emergency: bool,
    pub final_state: Option<FlightState>,
}

impl MissionReport {
    pub fn succeeded(&self) -> bool {
        self.fix_acquired
            && self.took_off
            && self.aborted.is_none()
            && !self.emergency
            && self.steps.iter().all(|s| s.result == StepResult::Done)
            && matches!(self.landing, Some(Ok(())))
    }

    fn skip_from(&mut self, steps: &[Step], first: usize) {
        for (index, step) in steps.iter().enumerate().skip(first) {
            self.steps.push(StepReport {
                index,
                step: step.clone(),
                result: StepResult::Skipped,
            });
        }
    }
}

/// Flies `mission` with an already connected controller.
///
/// The vehicle is landed on the way out whatever happened in the air. An
/// error is only returned when the link breaks before the takeoff; later
/// failures end up in the report. `operator` is called when the mission or
/// the options ask to pause before the takeoff.
pub fn run_mission<L, O>(
    controller: &mut FlightController<L>,
    mission: &Mission,
    options: &DriverOptions,
    mut operator: O,
) -> SortieResult<MissionReport>
where
    L: VehicleLink,
    O: FnMut(&str) -> SortieResult<()>,
{
    let mut report = MissionReport::default();
    let policy = mission
        .fix
        .clone()
        .unwrap_or_else(|| controller.config().fix.clone());

    report.fix_acquired = controller.acquire_fix(policy.attempts, policy.timeout())?;
    if !report.fix_acquired {
        error!("No GPS lock, not taking off");
        report.final_state = controller.flight_state().ok();
        return Ok(report);
    }

    match controller.validated_position() {
        Ok(position) => {
            info!("Position: {}", position);
            report.position = Some(position);
        }
        Err(PositionError::Connection(e)) => return Err(e),
        Err(e) => warn!("{}", e),
    }

    if mission.pause || options.interactive {
        operator("Press Enter to take off")?;
    }

    if let Err(e) = fly(controller, mission, &mut report) {
        error!("Mission aborted: {}", e);
        report.aborted = Some(e);
    }
    cleanup(controller, &mut report);
    Ok(report)
}

fn fly<L: VehicleLink>(
    controller: &mut FlightController<L>,
    mission: &Mission,
    report: &mut MissionReport,
) -> Result<(), FlightError> {
    if let Some(mode) = mission.camera {
        tolerate(controller.configure_camera(mode))?;
    }
    if let Some(pitch) = mission.gimbal_pitch {
        tolerate(controller.gimbal_pitch(pitch))?;
    }

    if let Err(e) = controller.takeoff() {
        report.skip_from(&mission.steps, 0);
        return tolerate(Err(e));
    }
    report.took_off = true;

    for (index, step) in mission.steps.iter().enumerate() {
        let state = controller.flight_state()?;
        if state != FlightState::Hovering {
            warn!("Vehicle is {}, dropping the remaining steps", state);
            report.skip_from(&mission.steps, index);
            break;
        }
        let result = match run_step(controller, step) {
            Ok(()) => StepResult::Done,
            Err(e) if e.is_fatal() => {
                report.steps.push(StepReport {
                    index,
                    step: step.clone(),
                    result: StepResult::Failed(e.clone()),
                });
                report.skip_from(&mission.steps, index + 1);
                return Err(e);
            }
            Err(e) => {
                warn!("Step {} failed: {}", index + 1, e);
                StepResult::Failed(e)
            }
        };
        report.steps.push(StepReport {
            index,
            step: step.clone(),
            result,
        });
    }
    Ok(())
}

/// Swallows everything but fatal errors, which have already been logged.
fn tolerate(result: Result<(), FlightError>) -> Result<(), FlightError> {
    match result {
        Err(e) if e.is_fatal() => Err(e),
        _ => Ok(()),
    }
}

fn run_step<L: VehicleLink>(
    controller: &mut FlightController<L>,
    step: &Step,
) -> Result<(), FlightError> {
    match step {
        Step::Move(motion) => controller.move_relative(motion.to_relative()),
        Step::Gimbal(pitch) => controller.gimbal_pitch(*pitch),
        Step::Camera(mode) => controller.configure_camera(*mode),
        Step::Hold(ms) => {
            info!("Holding for {} ms", ms);
            thread::sleep(Duration::from_millis(*ms));
            Ok(())
        }
    }
}

fn cleanup<L: VehicleLink>(controller: &mut FlightController<L>, report: &mut MissionReport) {
    match controller.flight_state() {
        Ok(state) if state.is_airborne() => {
            let landing = controller.land();
            if matches!(
                landing,
                Err(FlightError::Escalated { .. }) | Err(FlightError::EmergencyCutFailed)
            ) {
                report.emergency = true;
            }
            report.landing = Some(landing);
        }
        Ok(FlightState::Emergency) => report.emergency = true,
        Ok(_) => {}
        Err(e) => error!("Cannot tell whether the vehicle needs landing: {}", e),
    }
    report.final_state = controller.flight_state().ok();
    if report.final_state == Some(FlightState::Emergency) {
        report.emergency = true;
    }
}
