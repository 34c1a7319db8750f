//! Host phases and run-phase sets
//!
//! The host drives the scheduler in one of three phases. A command declares
//! the phases in which it may be admitted; the set only gates admission and
//! never ends a running command.

use bitflags::bitflags;
use core::fmt;

/// Host lifecycle phase the scheduler is resolving in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Between user `init` and `start`
    Init,
    /// Between `start` and `stop`
    Active,
    /// After `stop`
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Init => write!(f, "init"),
            Phase::Active => write!(f, "active"),
            Phase::Stopped => write!(f, "stopped"),
        }
    }
}

bitflags! {
    /// Set of phases during which a command may be admitted
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RunPhases: u8 {
        /// Admitted while the host is initialising
        const INIT = 0b0000_0001;
        /// Admitted while the host is running
        const ACTIVE = 0b0000_0010;
        /// Admitted after the host stopped
        const STOPPED = 0b0000_0100;
    }
}

impl RunPhases {
    /// Check whether a command with this set may be admitted in `phase`
    pub fn allows(self, phase: Phase) -> bool {
        self.contains(RunPhases::from(phase))
    }
}

impl Default for RunPhases {
    fn default() -> Self {
        RunPhases::ACTIVE
    }
}

impl From<Phase> for RunPhases {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Init => RunPhases::INIT,
            Phase::Active => RunPhases::ACTIVE,
            Phase::Stopped => RunPhases::STOPPED,
        }
    }
}
