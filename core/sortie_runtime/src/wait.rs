use crate::link::{Ack, EventMark, Observation, VehicleLink};
use log::debug;
use sortie_payloads::{Command, Expectation};
use sortie_traits::SortieResult;
use std::time::Duration;

/// How waiting on a command ended. Every issued command yields exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Confirmed,
    TimedOut,
    Rejected,
}

/// Sends `command` and blocks until `expected` is observed or the command deadline elapses.
///
/// A broken link is not an outcome, it comes back as an error.
pub fn issue_and_wait<L>(
    link: &mut L,
    command: &Command,
    expected: &Expectation,
) -> SortieResult<Outcome>
where
    L: VehicleLink + ?Sized,
{
    debug!("Sending {}, expecting {}", command, expected);
    let since = match link.send(command)? {
        Ack::Rejected => {
            debug!("{} rejected by the vehicle", command.action());
            return Ok(Outcome::Rejected);
        }
        Ack::Pending(mark) => mark,
    };
    if *expected == Expectation::Accepted {
        return Ok(Outcome::Confirmed);
    }
    await_event(link, expected, since, command.deadline())
}

/// Waits for `expected` without sending anything.
pub fn await_event<L>(
    link: &mut L,
    expected: &Expectation,
    since: EventMark,
    deadline: Duration,
) -> SortieResult<Outcome>
where
    L: VehicleLink + ?Sized,
{
    let outcome = match link.observe(expected, since, deadline)? {
        Observation::Matched => Outcome::Confirmed,
        Observation::TimedOut => Outcome::TimedOut,
    };
    debug!("Waiting for {} ended with {:?}", expected, outcome);
    Ok(outcome)
}
