//! Race group
//!
//! Runs every child concurrently. Without a deadline the race is over as
//! soon as any child finishes; with a deadline only the deadline decides.
//! Children still running when the race ends are interrupted.

use super::{render_child, render_list, GroupCore};
use crate::command::{Command, CommandId, CommandRef, CommandResult, LifecyclePhase};
use crate::phase::RunPhases;
use crate::resource::ResourceSet;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;

/// Runs children concurrently until the first (or the deadline) finishes
pub struct Race {
    core: GroupCore,
    deadline: Option<CommandRef>,
    /// Set once the children have been started this run
    started: Cell<bool>,
}

impl Race {
    /// Create a race between `commands`, optionally governed by `deadline`
    ///
    /// The deadline runs alongside the other children.
    pub fn new<I>(deadline: Option<CommandRef>, commands: I) -> Self
    where
        I: IntoIterator<Item = CommandRef>,
    {
        let mut all: Vec<CommandRef> = commands.into_iter().collect();
        if let Some(deadline) = &deadline {
            all.push(deadline.clone());
        }
        Self {
            core: GroupCore::new(all),
            deadline,
            started: Cell::new(false),
        }
    }

    /// Children other than the deadline
    fn racers(&self) -> impl Iterator<Item = &CommandRef> {
        let deadline = self.deadline.as_ref().map(|d| d.id());
        self.core
            .commands()
            .iter()
            .filter(move |c| Some(c.id()) != deadline)
    }

    /// New race with `commands` added, keeping the deadline
    pub fn add_commands<I>(&self, commands: I) -> Self
    where
        I: IntoIterator<Item = CommandRef>,
    {
        let mut racers: Vec<CommandRef> = self.racers().cloned().collect();
        racers.extend(commands);
        Self::new(self.deadline.clone(), racers)
    }

    /// New race over the same children governed by `deadline`
    ///
    /// Replaces any existing deadline.
    pub fn set_deadline(&self, deadline: CommandRef) -> Self {
        Self::new(Some(deadline), self.racers().cloned().collect::<Vec<_>>())
    }

    /// The deadline, if any
    pub fn deadline(&self) -> Option<&CommandRef> {
        self.deadline.as_ref()
    }

    fn render(&self, target: Option<(CommandId, &str)>) -> String {
        let head = match &self.deadline {
            Some(deadline) => format!("race {}", render_child(deadline, target)),
            None => String::from("race"),
        };
        render_list(&head, self.racers().map(|c| render_child(c, target)))
    }
}

impl fmt::Debug for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Race")
            .field("commands", &self.core.commands().len())
            .field("deadline", &self.deadline.is_some())
            .field("started", &self.started.get())
            .finish()
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(None))
    }
}

impl Command for Race {
    fn initialise(&self) -> CommandResult {
        self.started.set(false);
        for command in self.core.commands() {
            self.core.queue_init(command.clone());
        }
        Ok(())
    }

    fn execute(&self) -> CommandResult {
        self.started.set(true);
        self.core.execute(self)
    }

    fn end(&self, interrupted: bool) -> CommandResult {
        let deadline = self.deadline.as_ref().map(|d| d.id());
        let result = self.core.end_with(self, |command| {
            if Some(command.id()) == deadline {
                interrupted
            } else {
                true
            }
        });
        self.core.clear_queues();
        self.started.set(false);
        result
    }

    fn finished(&self) -> CommandResult<bool> {
        match &self.deadline {
            Some(deadline) => deadline
                .finished()
                .map_err(|e| e.unwind(&**deadline, self, LifecyclePhase::Finished)),
            None => {
                let total = self.core.commands().len();
                Ok(total == 0 || (self.started.get() && self.core.active_len() < total))
            }
        }
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
        self.render(Some((target, sub)))
    }
}
