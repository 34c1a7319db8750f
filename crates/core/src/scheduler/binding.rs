//! Polled triggers
//!
//! A binding is polled once per tick, before the scheduler resolves. It
//! receives the scheduler so it can schedule or cancel commands without
//! holding its own handle.

use super::Scheduler;
use crate::command::CommandRef;
use alloc::boxed::Box;
use core::fmt;

/// Poll function registered with the scheduler
pub struct Binding {
    poll: Box<dyn FnMut(&Scheduler)>,
}

impl Binding {
    /// Wrap an arbitrary poll function
    pub fn new<F>(poll: F) -> Self
    where
        F: FnMut(&Scheduler) + 'static,
    {
        Self {
            poll: Box::new(poll),
        }
    }

    /// Schedule `command` on every poll where `condition` holds
    pub fn run_command<C>(mut condition: C, command: CommandRef) -> Self
    where
        C: FnMut() -> bool + 'static,
    {
        Self::new(move |scheduler| {
            if condition() {
                scheduler.schedule(command.clone());
            }
        })
    }

    /// Cancel `command` on every poll where `condition` holds
    pub fn cancel_command<C>(mut condition: C, command: CommandRef) -> Self
    where
        C: FnMut() -> bool + 'static,
    {
        Self::new(move |scheduler| {
            if condition() {
                scheduler.cancel(&command);
            }
        })
    }

    /// Run the poll function once
    pub fn poll(&mut self, scheduler: &Scheduler) {
        (self.poll)(scheduler);
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Binding")
    }
}
