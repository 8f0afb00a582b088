//! The contract a vehicle connection has to fulfil for the flight core.

use sortie_payloads::{Command, Expectation, FlightState, Position};
use sortie_traits::SortieResult;
use std::time::Duration;

/// Position in the stream of events delivered by a link.
/// A wait started from a mark only considers events delivered after it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventMark(pub u64);

/// Immediate answer of the vehicle to a submitted command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ack {
    /// Accepted, its effects will show up as events after the given mark.
    Pending(EventMark),
    /// The vehicle refused the command outright.
    Rejected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Observation {
    Matched,
    TimedOut,
}

/// A connection to a vehicle.
///
/// Every method returns a `SortieError` only when the connection itself is
/// unusable; refusals and timeouts are regular answers. The link is the
/// single source of truth for the vehicle state, the flight core never keeps
/// its own copy.
pub trait VehicleLink {
    fn connect(&mut self) -> SortieResult<()>;

    /// Must be callable on every exit path, including after an emergency.
    fn disconnect(&mut self) -> SortieResult<()>;

    /// Waits at most the command deadline for the vehicle to accept or refuse.
    /// No answer within it is a broken link.
    fn send(&mut self, command: &Command) -> SortieResult<Ack>;

    /// Blocks until an event matching `expected` has been delivered after
    /// `since`, or until `deadline` elapsed.
    fn observe(
        &mut self,
        expected: &Expectation,
        since: EventMark,
        deadline: Duration,
    ) -> SortieResult<Observation>;

    /// Current end of the event stream.
    fn mark(&self) -> SortieResult<EventMark>;

    fn flight_state(&self) -> SortieResult<FlightState>;

    fn gps_fixed(&self) -> SortieResult<bool>;

    /// Last position reported by the vehicle, `None` as long as it has no fix.
    fn last_position(&self) -> SortieResult<Option<Position>>;
}
