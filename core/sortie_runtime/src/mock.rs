//! A scripted in-memory link for the unit tests of this crate.

use crate::link::{Ack, EventMark, Observation, VehicleLink};
use sortie_payloads::{Action, ActionKind, Command, Expectation, FlightState, Position};
use sortie_traits::SortieResult;
use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

/// What the scripted vehicle does with an accepted command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Confirms the command when observed.
    Confirm,
    /// Accepts the command but never confirms it.
    Stall,
    /// Refuses the command.
    Refuse,
}

pub struct ScriptedLink {
    pub state: FlightState,
    pub fixed: bool,
    pub position: Option<Position>,
    pub sent: Vec<Command>,
    pub observations: usize,
    pub fix_waits: VecDeque<Observation>,
    pub connected: bool,
    /// Shared so it can still be read once the link has been moved away and dropped.
    pub disconnects: Rc<Cell<usize>>,
    pub broken: bool,
    script: HashMap<ActionKind, Reply>,
    pending: Option<(Action, Reply)>,
    mark: u64,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self {
            state: FlightState::Landed,
            fixed: false,
            position: None,
            sent: Vec::new(),
            observations: 0,
            fix_waits: VecDeque::new(),
            connected: false,
            disconnects: Rc::new(Cell::new(0)),
            broken: false,
            script: HashMap::new(),
            pending: None,
            mark: 0,
        }
    }

    pub fn in_state(mut self, state: FlightState) -> Self {
        self.state = state;
        self
    }

    pub fn reply(mut self, kind: ActionKind, reply: Reply) -> Self {
        self.script.insert(kind, reply);
        self
    }

    pub fn sent_kinds(&self) -> Vec<ActionKind> {
        self.sent.iter().map(|c| c.action().kind()).collect()
    }

    fn check(&self) -> SortieResult<()> {
        if self.broken {
            return Err("scripted link is broken".into());
        }
        Ok(())
    }
}

impl VehicleLink for ScriptedLink {
    fn connect(&mut self) -> SortieResult<()> {
        self.check()?;
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> SortieResult<()> {
        self.connected = false;
        self.disconnects.set(self.disconnects.get() + 1);
        Ok(())
    }

    fn send(&mut self, command: &Command) -> SortieResult<Ack> {
        self.check()?;
        self.sent.push(*command);
        let action = *command.action();
        let reply = self
            .script
            .get(&action.kind())
            .copied()
            .unwrap_or(Reply::Confirm);
        if reply == Reply::Refuse {
            return Ok(Ack::Rejected);
        }
        match (action, reply) {
            (Action::Emergency, _) => self.state = FlightState::Emergency,
            (Action::TakeOff, Reply::Stall) => self.state = FlightState::TakingOff,
            (Action::Land, Reply::Stall) => self.state = FlightState::Landing,
            _ => {}
        }
        self.pending = Some((action, reply));
        self.mark += 1;
        Ok(Ack::Pending(EventMark(self.mark)))
    }

    fn observe(
        &mut self,
        expected: &Expectation,
        _since: EventMark,
        _deadline: Duration,
    ) -> SortieResult<Observation> {
        self.check()?;
        self.observations += 1;
        if let Expectation::GpsFix(_) = expected {
            let observation = self.fix_waits.pop_front().unwrap_or(Observation::TimedOut);
            if observation == Observation::Matched {
                self.fixed = true;
            }
            return Ok(observation);
        }
        match self.pending.take() {
            Some((action, Reply::Confirm)) => {
                match action {
                    Action::TakeOff | Action::MoveBy { .. } => self.state = FlightState::Hovering,
                    Action::Land => self.state = FlightState::Landed,
                    _ => {}
                }
                Ok(Observation::Matched)
            }
            _ => Ok(Observation::TimedOut),
        }
    }

    fn mark(&self) -> SortieResult<EventMark> {
        self.check()?;
        Ok(EventMark(self.mark))
    }

    fn flight_state(&self) -> SortieResult<FlightState> {
        self.check()?;
        Ok(self.state)
    }

    fn gps_fixed(&self) -> SortieResult<bool> {
        self.check()?;
        Ok(self.fixed)
    }

    fn last_position(&self) -> SortieResult<Option<Position>> {
        self.check()?;
        Ok(self.position)
    }
}
