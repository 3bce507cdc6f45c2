// simulator/src/clock.rs

use crate::{SimResult, SimulatorError};
use sim_core::{SimTime, SECONDS_PER_YEAR};

/// Monotonic simulated clock
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimClock {
    now: SimTime,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Check that the clock could move to `time`, without moving it
    pub fn check_advance(&self, time: SimTime) -> SimResult<()> {
        if !time.is_finite() || time < self.now {
            return Err(SimulatorError::InvariantViolation(format!(
                "clock cannot move from {} to {}",
                self.now, time
            )));
        }
        Ok(())
    }

    /// Move the clock forward. Going backwards is an invariant violation.
    pub fn advance_to(&mut self, time: SimTime) -> SimResult<()> {
        self.check_advance(time)?;
        self.now = time;
        Ok(())
    }

    pub fn elapsed_years(&self) -> f64 {
        self.now / SECONDS_PER_YEAR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_monotonic() {
        let mut clock = SimClock::new();
        clock.advance_to(10.0).unwrap();
        clock.advance_to(10.0).unwrap();
        assert!(clock.advance_to(5.0).is_err());
        assert!(clock.advance_to(f64::INFINITY).is_err());
        assert_eq!(clock.now(), 10.0);
    }

    #[test]
    fn test_check_advance_leaves_clock() {
        let mut clock = SimClock::new();
        clock.advance_to(3.0).unwrap();

        clock.check_advance(8.0).unwrap();
        assert!(clock.check_advance(1.0).is_err());
        assert!(clock.check_advance(f64::NAN).is_err());
        assert_eq!(clock.now(), 3.0);
    }

    #[test]
    fn test_elapsed_years() {
        let mut clock = SimClock::new();
        clock.advance_to(SECONDS_PER_YEAR / 2.0).unwrap();
        assert!((clock.elapsed_years() - 0.5).abs() < 1e-12);
    }
}
