//! Command contract
//!
//! Every unit the scheduler runs implements [`Command`]: a four-call
//! lifecycle (`initialise`, `execute`, `finished`, `end`) plus a fixed
//! resource footprint. Lifecycle calls take `&self` because commands are
//! shared between the scheduler and the groups that contain them; runtime
//! state lives behind `Cell`/`RefCell`.
//!
//! # Modules
//!
//! - [`error`]: Lifecycle errors and nested unwind traces
//! - [`lambda`]: Closure-backed command builder
//! - [`stateful`]: Lambda builder whose closures share a state value
//! - [`naming`]: Display-name normalisation

pub mod error;
pub mod lambda;
pub mod naming;
pub mod stateful;

pub use error::{CommandError, CommandResult, LifecyclePhase, UnwindTrace};
pub use lambda::Lambda;
pub use stateful::StatefulLambda;

use crate::group::{Parallel, Race, Sequential};
use crate::phase::RunPhases;
use crate::resource::ResourceSet;
use crate::traits::TimeSource;
use crate::util::Wait;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use core::time::Duration;

/// Shared handle to a command.
pub type CommandRef = Rc<dyn Command>;

/// Identity of a command instance.
///
/// Two handles refer to the same command iff their ids are equal. The id
/// is the address of the command value, so it is only meaningful while the
/// command is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandId(usize);

impl CommandId {
    /// Identity of the command behind a shared handle.
    pub fn of(command: &CommandRef) -> Self {
        Self(Rc::as_ptr(command) as *const () as usize)
    }

    fn from_ref<T: ?Sized>(command: &T) -> Self {
        Self(command as *const T as *const () as usize)
    }
}

/// Lifecycle contract implemented by every schedulable unit.
///
/// # Lifecycle
///
/// 1. `initialise()` - Called once when the command is admitted
/// 2. `execute()` - Called every tick while active
/// 3. `finished()` - Polled every tick; `true` ends the command
/// 4. `end(interrupted)` - Called once, `interrupted` is `true` when the
///    command was cancelled or evicted rather than finishing on its own
///
/// The display form (`Display`) is the command's diagnostic s-expression.
pub trait Command: fmt::Display {
    /// Called once when the command starts running.
    fn initialise(&self) -> CommandResult;

    /// Called once per tick while the command is active.
    fn execute(&self) -> CommandResult;

    /// Called once when the command stops running.
    fn end(&self, interrupted: bool) -> CommandResult;

    /// Polled once per tick; `true` means the command is done.
    fn finished(&self) -> CommandResult<bool>;

    /// Resources this command needs exclusive access to.
    ///
    /// Must not change after it is first observed.
    fn requirements(&self) -> ResourceSet;

    /// Host phases during which this command may be admitted.
    ///
    /// Must not change after it is first observed.
    fn run_phases(&self) -> RunPhases;

    /// Whether another command may evict this one from its resources.
    fn interruptible(&self) -> bool {
        true
    }

    /// Hook invoked by [`crate::Scheduler::schedule`] before the command is
    /// queued, also when it is already scheduled.
    fn on_schedule(&self) {}

    /// Identity of this command instance.
    fn id(&self) -> CommandId {
        CommandId::from_ref(self)
    }

    /// Renders this command with `sub` substituted for the descendant
    /// identified by `target`.
    ///
    /// Leaves only match themselves; groups recurse into their children.
    fn unwind_stack_trace(&self, target: CommandId, sub: &str) -> String {
        if target == self.id() {
            sub.to_string()
        } else {
            self.to_string()
        }
    }
}

/// Composition helpers available on any shared command.
pub trait Compose {
    /// Runs `self`, then each of `next` in order.
    fn then<I>(&self, next: I) -> Sequential
    where
        I: IntoIterator<Item = CommandRef>;

    /// Runs `self` alongside `others`, finishing when all have finished.
    fn with<I>(&self, others: I) -> Parallel
    where
        I: IntoIterator<Item = CommandRef>;

    /// Runs `self` alongside `others`, finishing when any finishes.
    fn race_with<I>(&self, others: I) -> Race
    where
        I: IntoIterator<Item = CommandRef>;

    /// Runs `others` until `self` finishes.
    fn as_deadline<I>(&self, others: I) -> Race
    where
        I: IntoIterator<Item = CommandRef>;

    /// Runs `self` for at most `duration`.
    fn timeout<T>(&self, duration: Duration, time: T) -> Race
    where
        T: TimeSource + 'static;
}

impl Compose for CommandRef {
    fn then<I>(&self, next: I) -> Sequential
    where
        I: IntoIterator<Item = CommandRef>,
    {
        Sequential::new(prepend(self, next))
    }

    fn with<I>(&self, others: I) -> Parallel
    where
        I: IntoIterator<Item = CommandRef>,
    {
        Parallel::new(prepend(self, others))
    }

    fn race_with<I>(&self, others: I) -> Race
    where
        I: IntoIterator<Item = CommandRef>,
    {
        Race::new(None, prepend(self, others))
    }

    fn as_deadline<I>(&self, others: I) -> Race
    where
        I: IntoIterator<Item = CommandRef>,
    {
        Race::new(Some(self.clone()), others)
    }

    fn timeout<T>(&self, duration: Duration, time: T) -> Race
    where
        T: TimeSource + 'static,
    {
        let deadline: CommandRef = Rc::new(Wait::new(duration, time));
        Race::new(Some(deadline), [self.clone()])
    }
}

fn prepend<I>(first: &CommandRef, rest: I) -> Vec<CommandRef>
where
    I: IntoIterator<Item = CommandRef>,
{
    let mut commands = alloc::vec![first.clone()];
    commands.extend(rest);
    commands
}
