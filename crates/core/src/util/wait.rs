//! Time-based leaf command

use crate::command::{Command, CommandResult};
use crate::phase::RunPhases;
use crate::resource::ResourceSet;
use crate::traits::TimeSource;
use core::cell::Cell;
use core::fmt;
use core::time::Duration;

/// Finishes once `duration` has passed since it was initialised
///
/// Completion is only noticed when the scheduler polls `finished()`, so the
/// effective resolution is one tick.
#[derive(Debug, Clone)]
pub struct Wait<T: TimeSource> {
    duration: Duration,
    time: T,
    start_us: Cell<u64>,
}

impl<T: TimeSource> Wait<T> {
    /// Create a wait of `duration` measured on `time`
    pub fn new(duration: Duration, time: T) -> Self {
        Self {
            duration,
            time,
            start_us: Cell::new(0),
        }
    }

    /// Configured duration
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl<T: TimeSource> fmt::Display for Wait<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(wait {:?})", self.duration.as_secs_f64())
    }
}

impl<T: TimeSource> Command for Wait<T> {
    fn initialise(&self) -> CommandResult {
        self.start_us.set(self.time.now_us());
        Ok(())
    }

    fn execute(&self) -> CommandResult {
        Ok(())
    }

    fn end(&self, _interrupted: bool) -> CommandResult {
        Ok(())
    }

    fn finished(&self) -> CommandResult<bool> {
        Ok(self.time.has_elapsed(self.start_us.get(), self.duration))
    }

    fn requirements(&self) -> ResourceSet {
        ResourceSet::new()
    }

    fn run_phases(&self) -> RunPhases {
        RunPhases::INIT | RunPhases::ACTIVE
    }
}
