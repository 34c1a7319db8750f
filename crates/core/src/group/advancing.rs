//! Advancing group
//!
//! A sequence paced from outside: nothing moves on until [`Advancing::advance`]
//! is called, typically from a child's `end` hook or an input binding.
//! Scheduling the group advances it, so the first child is queued by the
//! time the group is admitted.

use super::{render_group, GroupCore};
use crate::command::{Command, CommandId, CommandRef, CommandResult};
use crate::phase::RunPhases;
use crate::resource::ResourceSet;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;

/// Sequence advanced by explicit [`Advancing::advance`] calls
#[derive(Debug)]
pub struct Advancing {
    core: GroupCore,
    /// Index of the next child to start
    cursor: Cell<usize>,
}

impl Advancing {
    /// Create an externally paced sequence of `commands`
    pub fn new<I>(commands: I) -> Self
    where
        I: IntoIterator<Item = CommandRef>,
    {
        Self {
            core: GroupCore::new(commands.into_iter().collect()),
            cursor: Cell::new(0),
        }
    }

    /// New group with `commands` appended to this one's children
    pub fn add_commands<I>(&self, commands: I) -> Self
    where
        I: IntoIterator<Item = CommandRef>,
    {
        let mut all: Vec<CommandRef> = self.core.commands().to_vec();
        all.extend(commands);
        Self::new(all)
    }

    /// Interrupt the running child and queue the next one
    ///
    /// A child queued by an earlier call that has not started yet is
    /// replaced, so at most one child runs at a time. Does nothing once the
    /// last child has been queued. Can be called before the group is
    /// admitted, which is how nested advancing groups get their first child
    /// queued.
    pub fn advance(&self) {
        let index = self.cursor.get();
        if let Some(next) = self.core.commands().get(index) {
            self.core.queue_end_active(true);
            self.core.clear_init_queue();
            self.core.queue_init(next.clone());
            self.cursor.set(index + 1);
        }
    }

    /// `true` while children remain to be queued
    pub fn has_next(&self) -> bool {
        self.cursor.get() < self.core.commands().len()
    }
}

impl fmt::Display for Advancing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_group("advancing", self.core.commands(), None))
    }
}

impl Command for Advancing {
    fn initialise(&self) -> CommandResult {
        Ok(())
    }

    fn execute(&self) -> CommandResult {
        self.core.execute(self)
    }

    fn end(&self, interrupted: bool) -> CommandResult {
        let result = self.core.end(self, interrupted);
        self.core.clear_queues();
        self.cursor.set(0);
        result
    }

    fn finished(&self) -> CommandResult<bool> {
        Ok(!self.has_next() && self.core.finished())
    }

    fn requirements(&self) -> ResourceSet {
        self.core.requirements()
    }

    fn run_phases(&self) -> RunPhases {
        self.core.run_phases()
    }

    fn interruptible(&self) -> bool {
        self.core.interruptible()
    }

    fn on_schedule(&self) {
        self.advance();
    }

    fn unwind_stack_trace(&self, target: CommandId, sub: &str) -> String {
        if target == self.id() {
            return String::from(sub);
        }
        render_group("advancing", self.core.commands(), Some((target, sub)))
    }
}
