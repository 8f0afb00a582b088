use sortie_payloads::{CameraMode, Expectation, FlightState, Position, VehicleEvent};
use sortie_runtime::link::{EventMark, Observation};
use sortie_traits::{SortieError, SortieResult};
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

const HISTORY_CAPACITY: usize = 1024;

/// Last value seen for every kind of event.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Telemetry {
    pub flight_state: FlightState,
    pub gps_fixed: bool,
    pub position: Option<Position>,
    pub gimbal_pitch: i16,
    pub camera_mode: CameraMode,
}

impl Telemetry {
    fn apply(&mut self, event: &VehicleEvent) {
        match *event {
            VehicleEvent::FlightStateChanged(state) => self.flight_state = state,
            VehicleEvent::GpsFixChanged(fixed) => self.gps_fixed = fixed,
            VehicleEvent::PositionChanged(position) => self.position = Some(position),
            VehicleEvent::GimbalAttitude { pitch } => self.gimbal_pitch = pitch,
            VehicleEvent::CameraModeChanged(mode) => self.camera_mode = mode,
        }
    }
}

struct BusState {
    seq: u64,
    history: VecDeque<(u64, VehicleEvent)>,
    telemetry: Telemetry,
    alive: bool,
}

/// Where decoded downlink events land and where waiters block on them.
pub struct EventBus {
    state: Mutex<BusState>,
    signal: Condvar,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BusState {
                seq: 0,
                history: VecDeque::with_capacity(HISTORY_CAPACITY),
                telemetry: Telemetry::default(),
                alive: true,
            }),
            signal: Condvar::new(),
        }
    }

    fn lock(&self) -> SortieResult<MutexGuard<'_, BusState>> {
        self.state
            .lock()
            .map_err(|_| SortieError::from("Event bus lock poisoned"))
    }

    pub fn publish(&self, event: VehicleEvent) -> SortieResult<EventMark> {
        let mut state = self.lock()?;
        state.seq += 1;
        let seq = state.seq;
        if state.history.len() == HISTORY_CAPACITY {
            state.history.pop_front();
        }
        state.history.push_back((seq, event));
        state.telemetry.apply(&event);
        self.signal.notify_all();
        Ok(EventMark(seq))
    }

    pub fn mark(&self) -> SortieResult<EventMark> {
        Ok(EventMark(self.lock()?.seq))
    }

    pub fn telemetry(&self) -> SortieResult<Telemetry> {
        Ok(self.lock()?.telemetry)
    }

    pub fn is_alive(&self) -> bool {
        self.lock().map(|state| state.alive).unwrap_or(false)
    }

    /// Wakes every waiter, they fail unless what they wait for already arrived.
    pub fn close(&self) {
        if let Ok(mut state) = self.lock() {
            state.alive = false;
        }
        self.signal.notify_all();
    }

    pub fn wait_for(
        &self,
        expected: &Expectation,
        since: EventMark,
        deadline: Duration,
    ) -> SortieResult<Observation> {
        let end = Instant::now() + deadline;
        let mut state = self.lock()?;
        loop {
            let seen = state
                .history
                .iter()
                .any(|(seq, event)| *seq > since.0 && expected.matches(event));
            if seen {
                return Ok(Observation::Matched);
            }
            if !state.alive {
                return Err(SortieError::new_with_cause(
                    "Vehicle link went down while waiting",
                    expected,
                ));
            }
            let now = Instant::now();
            if now >= end {
                return Ok(Observation::TimedOut);
            }
            let (guard, _) = self
                .signal
                .wait_timeout(state, end - now)
                .map_err(|_| SortieError::from("Event bus lock poisoned"))?;
            state = guard;
        }
    }
}
