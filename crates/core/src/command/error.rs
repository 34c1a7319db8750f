//! Command lifecycle errors
//!
//! A failure inside a nested command travels up through every enclosing
//! group. The first group to catch it wraps it into an [`UnwindTrace`]; each
//! further group re-renders the same trace one level up instead of adding a
//! new wrapper, so the scheduler ends up with one s-expression of the whole
//! composition with `ERR` marking the failing leaf.

use super::{Command, CommandId};
use alloc::boxed::Box;
use alloc::string::{String, ToString};
use core::fmt;

/// Result of a command lifecycle call
pub type CommandResult<T = ()> = Result<T, CommandError>;

/// Token substituted for the failing command in unwind traces
pub const ERR_MARKER: &str = "ERR";

/// Lifecycle call in which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// `initialise()`
    Initialise,
    /// `execute()`
    Execute,
    /// `finished()`
    Finished,
    /// `end()`
    End,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecyclePhase::Initialise => write!(f, "initialise"),
            LifecyclePhase::Execute => write!(f, "execute"),
            LifecyclePhase::Finished => write!(f, "finished?"),
            LifecyclePhase::End => write!(f, "end"),
        }
    }
}

/// Errors raised by command lifecycle calls
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Failure reported by user code
    #[error("{0}")]
    Failed(String),

    /// Foreign error raised by user code
    #[error(transparent)]
    Source(Box<dyn core::error::Error + 'static>),

    /// A state machine was asked for a state it has no command for
    #[error("no command mapped for state {state}")]
    MissingState {
        /// Display form of the missing key
        state: String,
    },

    /// Failure inside a group, carrying the nested trace
    #[error(transparent)]
    Unwind(Box<UnwindTrace>),
}

impl CommandError {
    /// User failure with a message
    pub fn failed(message: impl Into<String>) -> Self {
        CommandError::Failed(message.into())
    }

    /// Wrap a foreign error
    pub fn from_error<E>(error: E) -> Self
    where
        E: core::error::Error + 'static,
    {
        CommandError::Source(Box::new(error))
    }

    /// Attach nesting context to an error raised by `child` while `parent`
    /// was driving it through `phase`.
    ///
    /// Existing traces are re-rendered one level up, misuse errors pass
    /// through untouched, everything else starts a new trace.
    pub fn unwind(self, child: &dyn Command, parent: &dyn Command, phase: LifecyclePhase) -> Self {
        match self {
            CommandError::Unwind(mut trace) => {
                trace.rewrap(parent);
                CommandError::Unwind(trace)
            }
            CommandError::MissingState { .. } => self,
            cause => CommandError::Unwind(Box::new(UnwindTrace {
                cause_command: child.to_string(),
                parent: parent.id(),
                phase,
                trace: parent.unwind_stack_trace(child.id(), ERR_MARKER),
                cause,
            })),
        }
    }
}

/// Nested failure trace accumulated while unwinding through groups
#[derive(Debug)]
pub struct UnwindTrace {
    cause_command: String,
    parent: CommandId,
    phase: LifecyclePhase,
    trace: String,
    cause: CommandError,
}

impl UnwindTrace {
    /// Display form of the leaf command that failed
    pub fn cause_command(&self) -> &str {
        &self.cause_command
    }

    /// Lifecycle call that failed in the leaf
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Outermost rendering so far, `ERR` marks the failing leaf
    pub fn trace(&self) -> &str {
        &self.trace
    }

    /// Error raised by the leaf
    pub fn cause(&self) -> &CommandError {
        &self.cause
    }

    fn rewrap(&mut self, context: &dyn Command) {
        self.trace = context.unwind_stack_trace(self.parent, &self.trace);
        self.parent = context.id();
    }
}

impl fmt::Display for UnwindTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "exception thrown in {}:\ncaused by: {}\ncause is marked as '{}' in this command s-expr\n{}",
            self.phase, self.cause_command, ERR_MARKER, self.trace
        )
    }
}

impl core::error::Error for UnwindTrace {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        Some(&self.cause)
    }
}
