//! Parallel group
//!
//! Starts every child in the same tick and finishes once all of them have
//! finished on their own.

use super::{render_group, GroupCore};
use crate::command::{Command, CommandId, CommandRef, CommandResult};
use crate::phase::RunPhases;
use crate::resource::ResourceSet;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Runs children concurrently until all have finished
#[derive(Debug)]
pub struct Parallel {
    core: GroupCore,
}

impl Parallel {
    /// Create a parallel group of `commands`
    pub fn new<I>(commands: I) -> Self
    where
        I: IntoIterator<Item = CommandRef>,
    {
        Self {
            core: GroupCore::new(commands.into_iter().collect()),
        }
    }

    /// New group with `commands` added to this one's children
    pub fn add_commands<I>(&self, commands: I) -> Self
    where
        I: IntoIterator<Item = CommandRef>,
    {
        let mut all: Vec<CommandRef> = self.core.commands().to_vec();
        all.extend(commands);
        Self::new(all)
    }

    pub(crate) fn core(&self) -> &GroupCore {
        &self.core
    }
}

impl fmt::Display for Parallel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_group("parallel", self.core.commands(), None))
    }
}

impl Command for Parallel {
    fn initialise(&self) -> CommandResult {
        for command in self.core.commands() {
            self.core.queue_init(command.clone());
        }
        Ok(())
    }

    fn execute(&self) -> CommandResult {
        self.core.execute(self)
    }

    fn end(&self, interrupted: bool) -> CommandResult {
        let result = self.core.end(self, interrupted);
        self.core.clear_queues();
        result
    }

    fn finished(&self) -> CommandResult<bool> {
        Ok(self.core.finished())
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

    fn unwind_stack_trace(&self, target: CommandId, sub: &str) -> String {
        if target == self.id() {
            return String::from(sub);
        }
        render_group("parallel", self.core.commands(), Some((target, sub)))
    }
}
