use crate::geo;
use crate::{SimFault, SimSettings};
use bincode::config::standard;
use compact_str::CompactString;
use log::{debug, warn};
use sortie_payloads::{Action, FlightState, Position, VehicleEvent};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Instant;
use uom::si::angle::radian;
use uom::si::f64::{Angle, Length};
use uom::si::length::meter;

/// An encoded action and where to answer whether it was accepted.
pub(crate) struct Uplink {
    pub frame: Vec<u8>,
    pub reply: Sender<bool>,
}

/// Telemetry and acks share one channel so an ack never overtakes the events sent before it.
pub(crate) enum Downlink {
    Telemetry(Vec<u8>),
    Ack { accepted: bool, reply: Sender<bool> },
}

/// The firmware stopped talking.
struct LinkLost;

pub(crate) struct Firmware {
    name: CompactString,
    settings: SimSettings,
    state: FlightState,
    position: Position,
    heading: Angle,
    /// Heading before the move in progress, restored if that move is cancelled.
    turning_from: Option<Angle>,
    fixed: bool,
    /// A glitching positioning subsystem reports this instead of the vehicle position.
    glitch: Option<Position>,
    scheduled: Vec<(Instant, VehicleEvent)>,
    downlink: Sender<Downlink>,
}

impl Firmware {
    pub fn new(name: CompactString, settings: SimSettings, downlink: Sender<Downlink>) -> Self {
        let position = settings.home;
        let glitch = settings.faults.iter().find_map(|f| match f {
            SimFault::PositionGlitch(p) => Some(*p),
            _ => None,
        });
        Self {
            name,
            settings,
            state: FlightState::Landed,
            position,
            heading: Angle::new::<radian>(0.0),
            turning_from: None,
            fixed: false,
            glitch,
            scheduled: Vec::new(),
            downlink,
        }
    }

    /// Serves uplink frames until the uplink is dropped or a fault cuts the link.
    pub fn run(mut self, uplink: Receiver<Uplink>) {
        let booted = Instant::now();
        if !self.faulty(|f| matches!(f, SimFault::NoFix)) {
            self.schedule(
                booted + self.settings.fix_delay,
                VehicleEvent::GpsFixChanged(true),
            );
        }
        self.emit(VehicleEvent::FlightStateChanged(self.state)).ok();

        loop {
            if self.flush_due().is_err() {
                break;
            }
            let received = match self.next_due() {
                Some(at) => uplink.recv_timeout(at.saturating_duration_since(Instant::now())),
                None => uplink.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(Uplink { frame, reply }) => {
                    if self.serve(&frame, reply).is_err() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("[{}] firmware stopped", self.name);
    }

    fn faulty(&self, predicate: impl Fn(&SimFault) -> bool) -> bool {
        self.settings.faults.iter().any(predicate)
    }

    fn serve(&mut self, frame: &[u8], reply: Sender<bool>) -> Result<(), LinkLost> {
        let action: Action = match bincode::decode_from_slice(frame, standard()) {
            Ok((action, _)) => action,
            Err(e) => {
                warn!("[{}] dropping malformed uplink frame: {}", self.name, e);
                return self.ack(false, reply);
            }
        };
        let kind = action.kind();
        if self.faulty(|f| *f == SimFault::DropLinkOn(kind)) {
            warn!("[{}] link dropped on {}", self.name, action);
            return Err(LinkLost);
        }
        let accepted = !self.faulty(|f| *f == SimFault::Refuse(kind)) && self.apply(action);
        debug!(
            "[{}] {} {}",
            self.name,
            if accepted { "accepted" } else { "refused" },
            action
        );
        self.flush_due()?;
        if !self.settings.ack_latency.is_zero() {
            thread::sleep(self.settings.ack_latency);
        }
        self.ack(accepted, reply)
    }

    /// Vehicle side rules. Returns whether the action is accepted.
    fn apply(&mut self, action: Action) -> bool {
        let now = Instant::now();
        let stalled = self.faulty(|f| *f == SimFault::Stall(action.kind()));
        match action {
            Action::TakeOff => {
                if self.state != FlightState::Landed {
                    return false;
                }
                self.schedule(now, VehicleEvent::FlightStateChanged(FlightState::TakingOff));
                if !stalled {
                    let at = now + self.settings.takeoff_latency;
                    let lifted = Position::new(
                        self.position.latitude(),
                        self.position.longitude(),
                        self.settings.takeoff_altitude,
                    );
                    self.schedule(at, VehicleEvent::PositionChanged(lifted));
                    self.schedule(at, VehicleEvent::FlightStateChanged(FlightState::Hovering));
                }
                true
            }
            Action::Land => {
                if !self.state.is_airborne() {
                    return false;
                }
                self.cancel_motion();
                self.schedule(now, VehicleEvent::FlightStateChanged(FlightState::Landing));
                if !stalled {
                    let at = now + self.settings.land_latency;
                    self.schedule(at, VehicleEvent::PositionChanged(self.on_ground()));
                    self.schedule(at, VehicleEvent::FlightStateChanged(FlightState::Landed));
                }
                true
            }
            Action::MoveBy { dx, dy, dz, dpsi } => {
                if self.state != FlightState::Hovering {
                    return false;
                }
                // A move the controller gave up on stops where it is.
                self.cancel_motion();
                let target = geo::displace(
                    self.position,
                    self.heading,
                    f64::from(dx),
                    f64::from(dy),
                    f64::from(dz),
                );
                self.turning_from = Some(self.heading);
                self.heading = geo::turn(self.heading, Angle::new::<radian>(f64::from(dpsi)));
                if !stalled {
                    let at = now + self.settings.move_latency;
                    self.schedule(at, VehicleEvent::PositionChanged(target));
                    self.schedule(at, VehicleEvent::FlightStateChanged(FlightState::Hovering));
                }
                true
            }
            Action::Emergency => {
                self.cancel_motion();
                self.schedule(now, VehicleEvent::FlightStateChanged(FlightState::Emergency));
                self.schedule(now, VehicleEvent::PositionChanged(self.on_ground()));
                true
            }
            Action::GimbalSetPitch { degrees } => {
                if !stalled {
                    let at = now + self.settings.gimbal_latency;
                    self.schedule(at, VehicleEvent::GimbalAttitude { pitch: degrees });
                }
                true
            }
            Action::GimbalMaxSpeed(speed) => {
                debug!("[{}] gimbal max speed set to {:?}", self.name, speed);
                true
            }
            Action::SetCameraMode(mode) => {
                if !stalled {
                    let at = now + self.settings.gimbal_latency;
                    self.schedule(at, VehicleEvent::CameraModeChanged(mode));
                }
                true
            }
        }
    }

    fn on_ground(&self) -> Position {
        Position::new(
            self.position.latitude(),
            self.position.longitude(),
            Length::new::<meter>(0.0),
        )
    }

    /// Forgets pending flight state and position changes.
    fn cancel_motion(&mut self) {
        if let Some(heading) = self.turning_from.take() {
            self.heading = heading;
        }
        self.scheduled.retain(|(_, event)| {
            !matches!(
                event,
                VehicleEvent::FlightStateChanged(_) | VehicleEvent::PositionChanged(_)
            )
        });
    }

    fn schedule(&mut self, at: Instant, event: VehicleEvent) {
        // Stable insert: events due at the same time keep their order.
        let index = self.scheduled.partition_point(|(due, _)| *due <= at);
        self.scheduled.insert(index, (at, event));
    }

    fn next_due(&self) -> Option<Instant> {
        self.scheduled.first().map(|(at, _)| *at)
    }

    fn flush_due(&mut self) -> Result<(), LinkLost> {
        let now = Instant::now();
        let due = self.scheduled.partition_point(|(at, _)| *at <= now);
        let events: Vec<VehicleEvent> = self.scheduled.drain(..due).map(|(_, e)| e).collect();
        for event in events {
            self.emit(event)?;
        }
        Ok(())
    }

    fn emit(&mut self, event: VehicleEvent) -> Result<(), LinkLost> {
        match event {
            VehicleEvent::FlightStateChanged(state) => {
                if state == FlightState::Hovering {
                    self.turning_from = None;
                }
                self.state = state;
            }
            VehicleEvent::GpsFixChanged(fixed) => {
                // The position goes out first: whoever sees the fix can read it.
                if fixed && !self.fixed {
                    let reported = self.glitch.unwrap_or(self.position);
                    self.transmit(VehicleEvent::PositionChanged(reported))?;
                }
                self.fixed = fixed;
            }
            VehicleEvent::PositionChanged(position) => {
                // A glitching sensor does not move the vehicle.
                if self.glitch.is_none() {
                    self.position = position;
                }
                if !self.fixed {
                    return Ok(());
                }
            }
            _ => {}
        }
        self.transmit(event)
    }

    fn transmit(&self, event: VehicleEvent) -> Result<(), LinkLost> {
        let frame = bincode::encode_to_vec(event, standard()).map_err(|e| {
            warn!("[{}] cannot encode {:?}: {}", self.name, event, e);
            LinkLost
        })?;
        self.downlink
            .send(Downlink::Telemetry(frame))
            .map_err(|_| LinkLost)
    }

    fn ack(&self, accepted: bool, reply: Sender<bool>) -> Result<(), LinkLost> {
        self.downlink
            .send(Downlink::Ack { accepted, reply })
            .map_err(|_| LinkLost)
    }
}
