//! Orchestration core for flying a bounded mission.
//!
//! Everything here runs on a single thread of control: one command is issued,
//! its confirmation is awaited (or its deadline elapses), then the next one
//! may go. The vehicle itself sits behind the [`link::VehicleLink`] trait.

pub mod config;
pub mod fix;
pub mod flight;
pub mod link;
pub mod position;
pub mod wait;

#[cfg(test)]
mod mock;

pub use config::{read_configuration, FixPolicy, FlightConfig, Timeouts};
pub use fix::FixAcquisition;
pub use flight::{FlightController, FlightError, Operation, Resolution};
pub use link::{Ack, EventMark, Observation, VehicleLink};
pub use position::{PositionError, PositionField};
pub use wait::{await_event, issue_and_wait, Outcome};

pub use sortie_traits::{SortieError, SortieResult};

pub mod prelude {
    pub use crate::config::*;
    pub use crate::fix::*;
    pub use crate::flight::*;
    pub use crate::link::*;
    pub use crate::position::*;
    pub use crate::wait::*;
    pub use sortie_payloads::*;
    pub use sortie_traits::*;
}
