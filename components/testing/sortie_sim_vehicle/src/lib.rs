//! A simulated vehicle speaking the [`VehicleLink`] contract.
//!
//! Connecting boots a firmware thread that receives bincode encoded actions
//! over an uplink channel and pushes bincode encoded events back over a
//! downlink channel. A listener thread decodes the downlink into an
//! [`bus::EventBus`] the flight controller waits on. Faults can be injected
//! to make the vehicle stall, refuse, lose its fix or drop the link.

pub mod bus;
mod firmware;
pub mod geo;

use crate::bus::{EventBus, Telemetry};
use crate::firmware::{Downlink, Firmware, Uplink};
use bincode::config::standard;
use compact_str::CompactString;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sortie_payloads::{Action, ActionKind, Command, Expectation, FlightState, Position, VehicleEvent};
use sortie_runtime::link::{Ack, EventMark, Observation, VehicleLink};
use sortie_traits::{SortieError, SortieResult};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use uom::si::f64::Length;
use uom::si::length::meter;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimFault {
    /// Accepts the action but never confirms it.
    Stall(ActionKind),
    Refuse(ActionKind),
    /// The positioning subsystem never locks.
    NoFix,
    /// Reports this position when the fix is acquired.
    PositionGlitch(Position),
    /// The firmware dies on receiving this action, without answering.
    DropLinkOn(ActionKind),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimSettings {
    pub home: Position,
    pub fix_delay: Duration,
    pub takeoff_latency: Duration,
    pub land_latency: Duration,
    pub move_latency: Duration,
    /// Also used for the camera.
    pub gimbal_latency: Duration,
    pub takeoff_altitude: Length,
    /// How long the firmware takes to accept or refuse an action.
    pub ack_latency: Duration,
    /// How long a command may wait for the firmware to accept or refuse it,
    /// capped by the command deadline.
    pub ack_timeout: Duration,
    pub faults: Vec<SimFault>,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            home: Position::from_degrees(48.878_922, 2.367_782, 0.0),
            fix_delay: Duration::from_secs(3),
            takeoff_latency: Duration::from_secs(4),
            land_latency: Duration::from_secs(6),
            move_latency: Duration::from_secs(2),
            gimbal_latency: Duration::from_millis(500),
            takeoff_altitude: Length::new::<meter>(1.0),
            ack_latency: Duration::ZERO,
            ack_timeout: Duration::from_secs(2),
            faults: Vec::new(),
        }
    }
}

impl SimSettings {
    /// Millisecond latencies, for tests.
    pub fn fast() -> Self {
        Self {
            fix_delay: Duration::from_millis(20),
            takeoff_latency: Duration::from_millis(20),
            land_latency: Duration::from_millis(20),
            move_latency: Duration::from_millis(10),
            gimbal_latency: Duration::from_millis(5),
            ack_timeout: Duration::from_secs(1),
            ..Self::default()
        }
    }

    pub fn with_fault(mut self, fault: SimFault) -> Self {
        self.faults.push(fault);
        self
    }
}

struct Connection {
    uplink: Sender<Uplink>,
    bus: Arc<EventBus>,
    firmware: JoinHandle<()>,
    listener: JoinHandle<()>,
}

pub struct SimVehicle {
    name: CompactString,
    settings: SimSettings,
    connection: Option<Connection>,
    journal: Vec<Action>,
}

impl SimVehicle {
    pub fn new(name: impl Into<CompactString>, settings: SimSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            connection: None,
            journal: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }

    /// Every action sent so far, accepted or not.
    pub fn sent_actions(&self) -> &[Action] {
        &self.journal
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn telemetry(&self) -> SortieResult<Telemetry> {
        self.connection()?.bus.telemetry()
    }

    fn connection(&self) -> SortieResult<&Connection> {
        self.connection
            .as_ref()
            .ok_or_else(|| SortieError::from(format!("{} is not connected", self.name)))
    }

    fn spawn(&self) -> SortieResult<Connection> {
        let (uplink_tx, uplink_rx) = mpsc::channel::<Uplink>();
        let (downlink_tx, downlink_rx) = mpsc::channel::<Downlink>();
        let bus = Arc::new(EventBus::new());

        let firmware = Firmware::new(self.name.clone(), self.settings.clone(), downlink_tx);
        let firmware = thread::Builder::new()
            .name(format!("{}-firmware", self.name))
            .spawn(move || firmware.run(uplink_rx))
            .map_err(|e| SortieError::new_with_cause("Failed to start the firmware", e))?;

        let listener_bus = bus.clone();
        let name = self.name.clone();
        let listener = thread::Builder::new()
            .name(format!("{}-downlink", self.name))
            .spawn(move || listen(name, listener_bus, downlink_rx))
            .map_err(|e| SortieError::new_with_cause("Failed to start the downlink listener", e))?;

        Ok(Connection {
            uplink: uplink_tx,
            bus,
            firmware,
            listener,
        })
    }
}

/// Decodes the downlink into the bus until the firmware goes away.
fn listen(name: CompactString, bus: Arc<EventBus>, downlink: Receiver<Downlink>) {
    for message in downlink.iter() {
        match message {
            Downlink::Telemetry(frame) => {
                match bincode::decode_from_slice::<VehicleEvent, _>(&frame, standard()) {
                    Ok((event, _)) => {
                        if bus.publish(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("[{}] dropping malformed downlink frame: {}", name, e),
                }
            }
            Downlink::Ack { accepted, reply } => {
                // The sender may have given up waiting already.
                let _ = reply.send(accepted);
            }
        }
    }
    bus.close();
    debug!("[{}] downlink closed", name);
}

impl VehicleLink for SimVehicle {
    fn connect(&mut self) -> SortieResult<()> {
        if self.connection.is_some() {
            return Err(format!("{} is already connected", self.name).into());
        }
        info!("Connecting to {}", self.name);
        self.connection = Some(self.spawn()?);
        Ok(())
    }

    fn disconnect(&mut self) -> SortieResult<()> {
        let Some(connection) = self.connection.take() else {
            return Ok(());
        };
        info!("Disconnecting from {}", self.name);
        let Connection {
            uplink,
            bus,
            firmware,
            listener,
        } = connection;
        drop(uplink);
        let firmware = firmware.join();
        let listener = listener.join();
        bus.close();
        firmware.map_err(|_| SortieError::from("Firmware thread panicked"))?;
        listener.map_err(|_| SortieError::from("Downlink listener panicked"))?;
        Ok(())
    }

    fn send(&mut self, command: &Command) -> SortieResult<Ack> {
        let frame = bincode::encode_to_vec(command.action(), standard())
            .map_err(|e| SortieError::new_with_cause("Failed to encode the action", e))?;
        self.journal.push(*command.action());
        let connection = self.connection()?;
        let mark = connection.bus.mark()?;
        let (reply_tx, reply_rx) = mpsc::channel();
        connection
            .uplink
            .send(Uplink {
                frame,
                reply: reply_tx,
            })
            .map_err(|_| SortieError::from(format!("Uplink to {} is down", self.name)))?;
        match reply_rx.recv_timeout(self.settings.ack_timeout.min(command.deadline())) {
            Ok(true) => Ok(Ack::Pending(mark)),
            Ok(false) => Ok(Ack::Rejected),
            Err(e) => {
                // Without an answer nothing the vehicle reports can be trusted anymore.
                connection.bus.close();
                Err(SortieError::new_with_cause(
                    &format!("No answer from {} to {}", self.name, command.action()),
                    e,
                ))
            }
        }
    }

    fn observe(
        &mut self,
        expected: &Expectation,
        since: EventMark,
        deadline: Duration,
    ) -> SortieResult<Observation> {
        self.connection()?.bus.wait_for(expected, since, deadline)
    }

    fn mark(&self) -> SortieResult<EventMark> {
        self.connection()?.bus.mark()
    }

    fn flight_state(&self) -> SortieResult<FlightState> {
        Ok(self.live_telemetry()?.flight_state)
    }

    fn gps_fixed(&self) -> SortieResult<bool> {
        Ok(self.live_telemetry()?.gps_fixed)
    }

    fn last_position(&self) -> SortieResult<Option<Position>> {
        Ok(self.live_telemetry()?.position)
    }
}

impl SimVehicle {
    fn live_telemetry(&self) -> SortieResult<Telemetry> {
        let bus = &self.connection()?.bus;
        if !bus.is_alive() {
            return Err(format!("Link to {} is down", self.name).into());
        }
        bus.telemetry()
    }
}

impl Drop for SimVehicle {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            warn!("Failed to shut {} down: {}", self.name, e);
        }
    }
}
