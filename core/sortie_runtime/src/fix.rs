use crate::wait::Outcome;
use log::{error, info, warn};
use sortie_traits::SortieResult;
use std::time::Duration;

/// Bounded retry loop around a GPS fix wait.
///
/// The loop does not know how to wait, it is handed a waiter that is called
/// with the 1-based attempt number and the per attempt timeout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixAcquisition {
    max_attempts: u32,
    per_attempt_timeout: Duration,
}

impl FixAcquisition {
    pub fn new(max_attempts: u32, per_attempt_timeout: Duration) -> Self {
        Self {
            max_attempts,
            per_attempt_timeout,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn per_attempt_timeout(&self) -> Duration {
        self.per_attempt_timeout
    }

    /// Returns true as soon as one attempt confirms the fix.
    pub fn run<W>(&self, mut waiter: W) -> SortieResult<bool>
    where
        W: FnMut(u32, Duration) -> SortieResult<Outcome>,
    {
        for attempt in 1..=self.max_attempts {
            info!("Attempt {} to get GPS lock...", attempt);
            match waiter(attempt, self.per_attempt_timeout)? {
                Outcome::Confirmed => {
                    info!("GPS lock acquired on attempt {}", attempt);
                    return Ok(true);
                }
                Outcome::TimedOut => {
                    if attempt < self.max_attempts {
                        info!("Trying again");
                    }
                }
                Outcome::Rejected => {
                    warn!("GPS lock wait refused by the vehicle, not retrying");
                    break;
                }
            }
        }
        error!("Failed to get GPS lock");
        Ok(false)
    }
}
