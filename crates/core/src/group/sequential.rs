//! Sequential group
//!
//! Runs children one at a time in order. The next child is queued from
//! `finished()`, so there is one idle tick between consecutive children.

use super::{render_group, GroupCore};
use crate::command::{Command, CommandId, CommandRef, CommandResult};
use crate::phase::RunPhases;
use crate::resource::ResourceSet;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;

/// Runs children one after another
#[derive(Debug)]
pub struct Sequential {
    core: GroupCore,
    /// Index of the next child to queue, `None` when not running
    cursor: Cell<Option<usize>>,
}

impl Sequential {
    /// Create a sequence of `commands`
    pub fn new<I>(commands: I) -> Self
    where
        I: IntoIterator<Item = CommandRef>,
    {
        Self {
            core: GroupCore::new(commands.into_iter().collect()),
            cursor: Cell::new(None),
        }
    }

    /// New sequence with `commands` appended to this one's children
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

    /// Queue the child under the cursor, returns `false` when exhausted
    fn queue_next(&self) -> bool {
        match self.cursor.get() {
            Some(index) if index < self.core.commands().len() => {
                self.core.queue_init(self.core.commands()[index].clone());
                self.cursor.set(Some(index + 1));
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for Sequential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_group("sequential", self.core.commands(), None))
    }
}

impl Command for Sequential {
    fn initialise(&self) -> CommandResult {
        self.cursor.set(Some(0));
        self.queue_next();
        Ok(())
    }

    fn execute(&self) -> CommandResult {
        self.core.execute(self)
    }

    fn end(&self, interrupted: bool) -> CommandResult {
        let result = self.core.end(self, interrupted);
        self.core.clear_queues();
        self.cursor.set(None);
        result
    }

    fn finished(&self) -> CommandResult<bool> {
        Ok(self.core.finished() && !self.queue_next())
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
        render_group("sequential", self.core.commands(), Some((target, sub)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::command::{CommandError, Lambda};
    use alloc::rc::Rc;
    use alloc::string::ToString;
    use alloc::vec;

    #[test]
    fn test_runs_children_in_order() {
        let events: Events = Rc::default();
        let group = Sequential::new(vec![
            shared(leaf(&events, "1", 1)),
            shared(leaf(&events, "2", 1)),
        ]);

        group.initialise().unwrap();
        group.execute().unwrap();
        assert_eq!(take(&events), vec!["1:init", "1:execute"]);

        assert!(!group.finished().unwrap());
        group.execute().unwrap();
        assert_eq!(take(&events), vec!["1:end:false"]);

        // empty and not exhausted: queues the next child
        assert!(!group.finished().unwrap());
        group.execute().unwrap();
        assert_eq!(take(&events), vec!["2:init", "2:execute"]);
        assert_eq!(group.core().active_len(), 1);

        assert!(!group.finished().unwrap());
        group.execute().unwrap();
        assert_eq!(take(&events), vec!["2:end:false"]);
        assert!(group.finished().unwrap());
    }

    #[test]
    fn test_end_interrupts_active_child_and_resets() {
        let events: Events = Rc::default();
        let group = Sequential::new(vec![shared(leaf(&events, "1", 5))]);
        group.initialise().unwrap();
        group.execute().unwrap();
        take(&events);

        group.end(true).unwrap();
        assert_eq!(take(&events), vec!["1:end:true"]);
        assert!(group.finished().unwrap());

        group.initialise().unwrap();
        group.execute().unwrap();
        assert_eq!(take(&events), vec!["1:init", "1:execute"]);
    }

    #[test]
    fn test_end_drops_child_queued_by_finished() {
        let events: Events = Rc::default();
        let group = Sequential::new(vec![
            shared(leaf(&events, "a", 1)),
            shared(leaf(&events, "b", u32::MAX)),
        ]);
        group.initialise().unwrap();
        group.execute().unwrap();
        assert!(!group.finished().unwrap());
        group.execute().unwrap();
        assert_eq!(take(&events), vec!["a:init", "a:execute", "a:end:false"]);

        // queues "b", then the group is interrupted before it starts
        assert!(!group.finished().unwrap());
        group.end(true).unwrap();

        group.initialise().unwrap();
        group.execute().unwrap();
        assert_eq!(take(&events), vec!["a:init", "a:execute"]);
        assert_eq!(group.core().active_len(), 1);
    }

    #[test]
    fn test_empty_sequence_is_finished() {
        let group = Sequential::new(Vec::new());
        group.initialise().unwrap();
        group.execute().unwrap();
        assert!(group.finished().unwrap());
    }

    #[test]
    fn test_failing_child_renders_trace() {
        let failing: CommandRef =
            Rc::new(Lambda::new("execute").set_execute(|| Err(CommandError::failed("boom"))));
        let group = Sequential::new(vec![
            shared(Lambda::new("1")),
            failing,
            shared(Lambda::new("2")),
        ]);
        group.initialise().unwrap();
        group.execute().unwrap();
        assert!(!group.finished().unwrap());
        group.execute().unwrap();
        assert!(!group.finished().unwrap());

        let error = group.execute().unwrap_err();
        let CommandError::Unwind(trace) = error else {
            panic!("expected unwind trace");
        };
        assert_eq!(trace.trace(), "(sequential (\n\t1\n\tERR\n\t2))");
        assert_eq!(trace.cause_command(), "execute");
    }

    #[test]
    fn test_add_commands_keeps_original() {
        let group = Sequential::new(vec![shared(Lambda::new("a"))]);
        let longer = group.add_commands(vec![shared(Lambda::new("b"))]);
        assert_eq!(group.core().commands().len(), 1);
        assert_eq!(longer.to_string(), "(sequential (\n\ta\n\tb))");
    }
}
