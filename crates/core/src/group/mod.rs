//! Command groups
//!
//! A group owns a fixed list of children and drives them through a
//! two-queue protocol every tick:
//!
//! 1. Active children that report `finished()` are queued for `end(false)`
//! 2. The end queue is collapsed (last entry per child wins) and applied
//! 3. The init queue is collapsed (first entry per child wins) and applied
//! 4. Every active child is executed
//!
//! Combinators only decide what goes into the queues and when the group as
//! a whole is finished; [`GroupCore`] does the rest.

pub mod advancing;
pub mod parallel;
pub mod race;
pub mod sequential;

pub use advancing::Advancing;
pub use parallel::Parallel;
pub use race::Race;
pub use sequential::Sequential;

use crate::command::{Command, CommandError, CommandId, CommandRef, CommandResult, LifecyclePhase};
use crate::phase::RunPhases;
use crate::resource::ResourceSet;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{OnceCell, RefCell};
use core::fmt;

/// Shared child bookkeeping for group commands
pub struct GroupCore {
    commands: Vec<CommandRef>,
    active: RefCell<Vec<CommandRef>>,
    init_queue: RefCell<Vec<CommandRef>>,
    end_queue: RefCell<Vec<(CommandRef, bool)>>,
    requirements: OnceCell<ResourceSet>,
    run_phases: OnceCell<RunPhases>,
}

impl GroupCore {
    /// Create the bookkeeping for `commands`
    pub fn new(commands: Vec<CommandRef>) -> Self {
        Self {
            commands,
            active: RefCell::new(Vec::new()),
            init_queue: RefCell::new(Vec::new()),
            end_queue: RefCell::new(Vec::new()),
            requirements: OnceCell::new(),
            run_phases: OnceCell::new(),
        }
    }

    /// Every child, in construction order
    pub fn commands(&self) -> &[CommandRef] {
        &self.commands
    }

    /// Snapshot of the currently active children
    pub fn active(&self) -> Vec<CommandRef> {
        self.active.borrow().clone()
    }

    /// Number of currently active children
    pub fn active_len(&self) -> usize {
        self.active.borrow().len()
    }

    /// Queue `command` to be initialised on the next execute
    pub fn queue_init(&self, command: CommandRef) {
        self.init_queue.borrow_mut().push(command);
    }

    /// Queue `command` to be ended on the next execute
    pub fn queue_end(&self, command: CommandRef, interrupted: bool) {
        self.end_queue.borrow_mut().push((command, interrupted));
    }

    /// Queue every active child to be ended on the next execute
    pub fn queue_end_active(&self, interrupted: bool) {
        for command in self.active() {
            self.queue_end(command, interrupted);
        }
    }

    /// Drop children queued to start but not yet initialised
    pub fn clear_init_queue(&self) {
        self.init_queue.borrow_mut().clear();
    }

    /// Drop anything queued but not yet applied
    pub fn clear_queues(&self) {
        self.init_queue.borrow_mut().clear();
        self.end_queue.borrow_mut().clear();
    }

    fn is_active(&self, id: CommandId) -> bool {
        self.active.borrow().iter().any(|c| c.id() == id)
    }

    fn remove_active(&self, id: CommandId) {
        self.active.borrow_mut().retain(|c| c.id() != id);
    }

    /// Run one tick of the queue protocol on behalf of `owner`
    ///
    /// Errors are annotated with `owner` as the nesting context. Queue
    /// entries added by children while a queue is being applied are
    /// discarded with it.
    pub fn execute(&self, owner: &dyn Command) -> CommandResult {
        for command in self.active() {
            let finished = command
                .finished()
                .map_err(|e| e.unwind(&*command, owner, LifecyclePhase::Finished))?;
            if finished {
                self.queue_end(command, false);
            }
        }

        let ending = collapse_keep_last(&self.end_queue.borrow());
        for (command, interrupted) in ending {
            if !self.is_active(command.id()) {
                continue;
            }
            command
                .end(interrupted)
                .map_err(|e| e.unwind(&*command, owner, LifecyclePhase::End))?;
            self.remove_active(command.id());
        }
        self.end_queue.borrow_mut().clear();

        let starting = collapse_keep_first(&self.init_queue.borrow());
        for command in starting {
            if self.is_active(command.id()) {
                continue;
            }
            command
                .initialise()
                .map_err(|e| e.unwind(&*command, owner, LifecyclePhase::Initialise))?;
            self.active.borrow_mut().push(command);
        }
        self.init_queue.borrow_mut().clear();

        for command in self.active() {
            command
                .execute()
                .map_err(|e| e.unwind(&*command, owner, LifecyclePhase::Execute))?;
        }
        Ok(())
    }

    /// End every active child with `interrupted`, then forget them
    pub fn end(&self, owner: &dyn Command, interrupted: bool) -> CommandResult {
        self.end_with(owner, |_| interrupted)
    }

    /// End every active child with a per-child flag, then forget them
    pub fn end_with(
        &self,
        owner: &dyn Command,
        interrupted: impl Fn(&CommandRef) -> bool,
    ) -> CommandResult {
        for command in self.active() {
            command
                .end(interrupted(&command))
                .map_err(|e| e.unwind(&*command, owner, LifecyclePhase::End))?;
        }
        self.active.borrow_mut().clear();
        Ok(())
    }

    /// `true` once no child is active
    pub fn finished(&self) -> bool {
        self.active.borrow().is_empty()
    }

    /// Union of every child's requirements, computed once
    pub fn requirements(&self) -> ResourceSet {
        self.requirements
            .get_or_init(|| {
                self.commands
                    .iter()
                    .flat_map(|c| c.requirements())
                    .collect()
            })
            .clone()
    }

    /// Union of every child's run phases, computed once
    pub fn run_phases(&self) -> RunPhases {
        *self.run_phases.get_or_init(|| {
            self.commands
                .iter()
                .fold(RunPhases::empty(), |acc, c| acc | c.run_phases())
        })
    }

    /// `true` iff every active child is interruptible
    pub fn interruptible(&self) -> bool {
        self.active().iter().all(|c| c.interruptible())
    }
}

impl fmt::Debug for GroupCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupCore")
            .field("commands", &self.commands.len())
            .field("active", &self.active_len())
            .finish()
    }
}

fn collapse_keep_last(queue: &[(CommandRef, bool)]) -> Vec<(CommandRef, bool)> {
    queue
        .iter()
        .enumerate()
        .filter(|(i, (command, _))| {
            !queue[i + 1..].iter().any(|(later, _)| later.id() == command.id())
        })
        .map(|(_, entry)| entry.clone())
        .collect()
}

fn collapse_keep_first(queue: &[CommandRef]) -> Vec<CommandRef> {
    let mut collapsed: Vec<CommandRef> = Vec::with_capacity(queue.len());
    for command in queue {
        if !collapsed.iter().any(|c| c.id() == command.id()) {
            collapsed.push(command.clone());
        }
    }
    collapsed
}

/// Render `(<kind> (\n\t<child>\n\t<child>))`, indenting nested lines
pub(crate) fn render_list<I>(head: &str, children: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let body = children.into_iter().collect::<Vec<_>>().join("\n");
    alloc::format!("({head} (\n\t{}))", body.replace('\n', "\n\t"))
}

/// Render a group, substituting `sub` for `target` when it is a descendant
pub(crate) fn render_group(
    kind: &str,
    children: &[CommandRef],
    target: Option<(CommandId, &str)>,
) -> String {
    render_list(kind, children.iter().map(|c| render_child(c, target)))
}

/// Render a single child, substituting when `target` is set
pub(crate) fn render_child(child: &CommandRef, target: Option<(CommandId, &str)>) -> String {
    use alloc::string::ToString;
    match target {
        Some((id, sub)) => child.unwind_stack_trace(id, sub),
        None => child.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Recording leaves shared by the group tests

    use crate::command::{CommandRef, Lambda};
    use alloc::format;
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};

    pub type Events = Rc<RefCell<Vec<String>>>;

    /// Leaf that records its lifecycle and finishes after `ticks` executes
    pub fn leaf(events: &Events, name: &'static str, ticks: u32) -> Lambda {
        let count = Rc::new(Cell::new(0u32));
        let (i, x, e) = (events.clone(), events.clone(), events.clone());
        let (ci, cx, cf) = (count.clone(), count.clone(), count);
        Lambda::new(name)
            .set_init(move || {
                ci.set(0);
                i.borrow_mut().push(format!("{name}:init"));
                Ok(())
            })
            .set_execute(move || {
                cx.set(cx.get() + 1);
                x.borrow_mut().push(format!("{name}:execute"));
                Ok(())
            })
            .set_finish(move || Ok(cf.get() >= ticks))
            .set_end(move |interrupted| {
                e.borrow_mut().push(format!("{name}:end:{interrupted}"));
                Ok(())
            })
    }

    pub fn shared(lambda: Lambda) -> CommandRef {
        Rc::new(lambda)
    }

    /// Drain recorded events
    pub fn take(events: &Events) -> Vec<String> {
        core::mem::take(&mut *events.borrow_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::command::Lambda;
    use alloc::rc::Rc;
    use alloc::string::ToString;
    use alloc::vec;

    #[test]
    fn test_collapse_keep_last_preserves_order() {
        let a = shared(Lambda::new("a"));
        let b = shared(Lambda::new("b"));
        let queue = vec![(a.clone(), false), (b.clone(), true), (a.clone(), true)];
        let collapsed = collapse_keep_last(&queue);
        assert_eq!(collapsed.len(), 2);
        assert_eq!(collapsed[0].0.id(), b.id());
        assert_eq!(collapsed[1].0.id(), a.id());
        assert!(collapsed[1].1);
    }

    #[test]
    fn test_collapse_keep_first() {
        let a = shared(Lambda::new("a"));
        let b = shared(Lambda::new("b"));
        let collapsed = collapse_keep_first(&[a.clone(), b.clone(), a.clone()]);
        assert_eq!(collapsed.len(), 2);
        assert_eq!(collapsed[0].id(), a.id());
        assert_eq!(collapsed[1].id(), b.id());
    }

    #[test]
    fn test_render_indents_nested_lines() {
        let inner = shared(Lambda::new("x"));
        let nested: CommandRef = Rc::new(Parallel::new(vec![inner]));
        let outer = Sequential::new(vec![shared(Lambda::new("a")), nested]);
        assert_eq!(
            outer.to_string(),
            "(sequential (\n\ta\n\t(parallel (\n\t\tx))))"
        );
    }

    #[test]
    fn test_core_end_queue_overrides_natural_finish() {
        let events: Events = Rc::default();
        let child = shared(leaf(&events, "a", 1));
        let group = Parallel::new(vec![child.clone()]);
        group.initialise().unwrap();
        group.execute().unwrap();
        take(&events);

        // the natural finish is queued after the cancellation, so it wins
        group.core().queue_end(child, true);
        group.execute().unwrap();
        assert_eq!(take(&events), vec!["a:end:false"]);
        assert!(group.finished().unwrap());
    }

    #[test]
    fn test_interruptible_requires_all_active() {
        let a = shared(Lambda::new("a").set_finish(|| Ok(false)));
        let b = shared(Lambda::new("b").set_finish(|| Ok(false)).set_interruptible(false));
        let group = Parallel::new(vec![a, b]);
        assert!(group.interruptible());
        group.initialise().unwrap();
        group.execute().unwrap();
        assert!(!group.interruptible());
    }
}
