//! Keyed branch re-selected on every schedule
//!
//! A selection maps keys to commands and runs at most one of them. Each time
//! it is scheduled it interrupts whatever it is running and starts the
//! command for the requested key, or for the default key when none is
//! given. An unmapped key just stops the current command.

use crate::command::{Command, CommandId, CommandRef, CommandResult, Lambda};
use crate::group::{render_list, GroupCore};
use crate::phase::RunPhases;
use crate::resource::ResourceSet;
use crate::scheduler::Scheduler;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

/// Runs the command mapped to the most recently selected key
pub struct SelectionCommand<K> {
    core: GroupCore,
    keys: Vec<K>,
    default_key: Rc<dyn Fn() -> K>,
    /// Key requested by the next `on_schedule`
    requested: RefCell<Option<K>>,
}

impl<K> SelectionCommand<K>
where
    K: PartialEq + Clone + fmt::Display + 'static,
{
    /// Create a selection over `(key, command)` pairs
    ///
    /// `default_key` is consulted whenever the selection is scheduled
    /// without an explicit key. Later pairs replace earlier ones with the
    /// same key.
    pub fn new<I, F>(selections: I, default_key: F) -> Self
    where
        I: IntoIterator<Item = (K, CommandRef)>,
        F: Fn() -> K + 'static,
    {
        let mut keys: Vec<K> = Vec::new();
        let mut commands: Vec<CommandRef> = Vec::new();
        for (key, command) in selections {
            match keys.iter().position(|k| *k == key) {
                Some(index) => commands[index] = command,
                None => {
                    keys.push(key);
                    commands.push(command);
                }
            }
        }
        Self {
            core: GroupCore::new(commands),
            keys,
            default_key: Rc::new(default_key),
            requested: RefCell::new(None),
        }
    }

    /// Command mapped to `key`
    pub fn get(&self, key: &K) -> Option<&CommandRef> {
        self.keys
            .iter()
            .position(|k| k == key)
            .map(|index| &self.core.commands()[index])
    }

    /// Interrupt the running command and queue the one mapped to `key`
    pub fn select(&self, key: &K) {
        self.core.queue_end_active(true);
        if let Some(command) = self.get(key) {
            self.core.queue_init(command.clone());
        }
    }

    /// Schedule the selection with `key` instead of the default key
    pub fn schedule_key(self: &Rc<Self>, scheduler: &Scheduler, key: K) {
        *self.requested.borrow_mut() = Some(key);
        scheduler.schedule(self.clone());
    }

    /// Command that schedules this selection with `key` when it starts
    pub fn selection_command(self: &Rc<Self>, scheduler: &Scheduler, key: K) -> Lambda {
        let selection = self.clone();
        let scheduler = scheduler.downgrade();
        Lambda::new(&format!("\\(select {key})")).set_init(move || {
            if let Some(scheduler) = scheduler.upgrade() {
                selection.schedule_key(&scheduler, key.clone());
            }
            Ok(())
        })
    }

    fn render(&self, target: Option<(CommandId, &str)>) -> String {
        let entries = self
            .keys
            .iter()
            .zip(self.core.commands())
            .map(|(key, command)| {
                let key = key.to_string();
                let command = match target {
                    Some((id, sub)) => command.unwind_stack_trace(id, sub),
                    None => command.to_string(),
                };
                if key == command {
                    command
                } else {
                    format!("({key} {command})")
                }
            });
        render_list("selection", entries)
    }
}

impl<K> fmt::Display for SelectionCommand<K>
where
    K: PartialEq + Clone + fmt::Display + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(None))
    }
}

impl<K> Command for SelectionCommand<K>
where
    K: PartialEq + Clone + fmt::Display + 'static,
{
    fn initialise(&self) -> CommandResult {
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

    fn on_schedule(&self) {
        let requested = self.requested.borrow_mut().take();
        let key = requested.unwrap_or_else(|| (self.default_key)());
        self.select(&key);
    }

    fn unwind_stack_trace(&self, target: CommandId, sub: &str) -> String {
        if target == self.id() {
            return String::from(sub);
        }
        self.render(Some((target, sub)))
    }
}
