//! Scheduler error types
//!
//! Errors surfaced from a tick. The message always starts with the
//! lifecycle call that failed, followed either by the failing command or,
//! for failures inside groups, by the failing leaf and the nested trace.

use crate::command::{CommandError, CommandRef, LifecyclePhase, UnwindTrace};
use alloc::boxed::Box;
use alloc::string::{String, ToString};

/// Errors surfaced by [`super::Scheduler::resolve`]
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// A command failed directly under the scheduler
    #[error("exception thrown in {phase}:\n{command}")]
    Lifecycle {
        /// Lifecycle call that failed
        phase: LifecyclePhase,
        /// Display form of the failing command
        command: String,
        /// Error raised by the command
        #[source]
        source: CommandError,
    },

    /// A command failed inside a group
    #[error(transparent)]
    Unwound(Box<UnwindTrace>),

    /// Structural misuse, reported as raised
    #[error(transparent)]
    Misuse(CommandError),
}

impl SchedulerError {
    /// Wrap an error raised by a top-level `command` during `phase`
    pub(crate) fn lifecycle(phase: LifecyclePhase, command: &CommandRef, error: CommandError) -> Self {
        match error {
            CommandError::Unwind(trace) => SchedulerError::Unwound(trace),
            CommandError::MissingState { .. } => SchedulerError::Misuse(error),
            source => SchedulerError::Lifecycle {
                phase,
                command: command.to_string().trim().to_string(),
                source,
            },
        }
    }

    /// Lifecycle call in which the failing command raised the error
    pub fn phase(&self) -> Option<LifecyclePhase> {
        match self {
            SchedulerError::Lifecycle { phase, .. } => Some(*phase),
            SchedulerError::Unwound(trace) => Some(trace.phase()),
            SchedulerError::Misuse(_) => None,
        }
    }
}
