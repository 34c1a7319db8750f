//! Keyed state machine
//!
//! Each state key maps to a command. Writing the shared [`StateCell`] (from
//! outside or from inside a state's own command) interrupts the running
//! state's command and starts the new state's command on the next execute.
//! Re-entering a state starts its command from scratch.

use crate::command::{Command, CommandError, CommandId, CommandRef, CommandResult, LifecyclePhase};
use crate::group::render_list;
use crate::phase::RunPhases;
use crate::resource::ResourceSet;
use crate::scheduler::Scheduler;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, OnceCell, RefCell};
use core::fmt;

struct StateCellInner<K> {
    value: RefCell<K>,
    changed: Cell<bool>,
}

/// Shared, observable state of a [`StateMachine`]
///
/// Every `set` marks a transition, including setting the current value
/// again.
pub struct StateCell<K> {
    inner: Rc<StateCellInner<K>>,
}

impl<K> Clone for StateCell<K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: Clone> StateCell<K> {
    /// Create a cell whose initial state is pending entry
    pub fn new(initial: K) -> Self {
        Self {
            inner: Rc::new(StateCellInner {
                value: RefCell::new(initial),
                changed: Cell::new(true),
            }),
        }
    }

    /// Current state
    pub fn get(&self) -> K {
        self.inner.value.borrow().clone()
    }

    /// Move to `state`
    pub fn set(&self, state: K) {
        *self.inner.value.borrow_mut() = state;
        self.inner.changed.set(true);
    }

    /// `true` while a transition is pending
    pub fn changed(&self) -> bool {
        self.inner.changed.get()
    }

    fn mark_changed(&self) {
        self.inner.changed.set(true);
    }

    fn clear_changed(&self) {
        self.inner.changed.set(false);
    }
}

/// Command that runs the command mapped to the current state
pub struct StateMachine<K> {
    cell: StateCell<K>,
    states: Vec<(K, CommandRef)>,
    current: RefCell<Option<CommandRef>>,
    requirements: OnceCell<ResourceSet>,
    run_phases: OnceCell<RunPhases>,
}

impl<K> StateMachine<K>
where
    K: PartialEq + Clone + fmt::Display + 'static,
{
    /// Create a machine with no states, starting in `initial`
    pub fn new(initial: K) -> Self {
        Self::from_parts(StateCell::new(initial), Vec::new())
    }

    fn from_parts(cell: StateCell<K>, states: Vec<(K, CommandRef)>) -> Self {
        Self {
            cell,
            states,
            current: RefCell::new(None),
            requirements: OnceCell::new(),
            run_phases: OnceCell::new(),
        }
    }

    /// New machine with `state` mapped to the command built by `generator`
    ///
    /// The generator receives the shared state cell and a name that renders
    /// as the key itself. Mapping an existing key replaces its command.
    pub fn with_state<F>(self, state: K, generator: F) -> Self
    where
        F: FnOnce(&StateCell<K>, &str) -> CommandRef,
    {
        let name = format!("\\{state}");
        let command = generator(&self.cell, &name);
        let mut states = self.states;
        match states.iter_mut().find(|(key, _)| *key == state) {
            Some(entry) => entry.1 = command,
            None => states.push((state, command)),
        }
        Self::from_parts(self.cell, states)
    }

    /// Shared state cell
    pub fn state_cell(&self) -> &StateCell<K> {
        &self.cell
    }

    /// Move to `state` and schedule the machine
    pub fn schedule_state(self: &Rc<Self>, scheduler: &Scheduler, state: K) {
        self.cell.set(state);
        scheduler.schedule(self.clone());
    }

    fn lookup(&self, state: &K) -> CommandResult<CommandRef> {
        self.states
            .iter()
            .find(|(key, _)| key == state)
            .map(|(_, command)| command.clone())
            .ok_or_else(|| CommandError::MissingState {
                state: state.to_string(),
            })
    }

    /// Command of the current state, starting it if necessary
    fn enter_current(&self) -> CommandResult<CommandRef> {
        if let Some(command) = self.current.borrow().clone() {
            return Ok(command);
        }
        self.cell.clear_changed();
        let command = self.lookup(&self.cell.get())?;
        command
            .initialise()
            .map_err(|e| e.unwind(&*command, self, LifecyclePhase::Initialise))?;
        *self.current.borrow_mut() = Some(command.clone());
        Ok(command)
    }

    fn render(&self, target: Option<(CommandId, &str)>) -> String {
        let entries = self.states.iter().map(|(key, command)| {
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
        render_list(&format!("state-machine {}", self.cell.get()), entries)
    }
}

impl<K> fmt::Display for StateMachine<K>
where
    K: PartialEq + Clone + fmt::Display + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(None))
    }
}

impl<K> Command for StateMachine<K>
where
    K: PartialEq + Clone + fmt::Display + 'static,
{
    fn initialise(&self) -> CommandResult {
        if self.current.borrow().is_none() {
            self.cell.mark_changed();
        }
        Ok(())
    }

    fn execute(&self) -> CommandResult {
        let running = self.current.borrow().clone();
        if let Some(command) = running {
            let finished = command
                .finished()
                .map_err(|e| e.unwind(&*command, self, LifecyclePhase::Finished))?;
            if finished {
                self.end(false)?;
            }
        }
        if self.cell.changed() {
            self.end(true)?;
            self.enter_current()?;
        }
        let running = self.current.borrow().clone();
        if let Some(command) = running {
            command
                .execute()
                .map_err(|e| e.unwind(&*command, self, LifecyclePhase::Execute))?;
        }
        Ok(())
    }

    fn end(&self, interrupted: bool) -> CommandResult {
        let running = self.current.borrow_mut().take();
        match running {
            Some(command) => command
                .end(interrupted)
                .map_err(|e| e.unwind(&*command, self, LifecyclePhase::End)),
            None => Ok(()),
        }
    }

    fn finished(&self) -> CommandResult<bool> {
        Ok(!self.cell.changed() && self.current.borrow().is_none())
    }

    fn requirements(&self) -> ResourceSet {
        self.requirements
            .get_or_init(|| {
                self.states
                    .iter()
                    .flat_map(|(_, c)| c.requirements())
                    .collect()
            })
            .clone()
    }

    fn run_phases(&self) -> RunPhases {
        *self.run_phases.get_or_init(|| {
            self.states
                .iter()
                .fold(RunPhases::empty(), |acc, (_, c)| acc | c.run_phases())
        })
    }

    fn interruptible(&self) -> bool {
        self.current
            .borrow()
            .as_ref()
            .map_or(true, |c| c.interruptible())
    }

    fn unwind_stack_trace(&self, target: CommandId, sub: &str) -> String {
        if target == self.id() {
            return String::from(sub);
        }
        self.render(Some((target, sub)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Lambda;
    use crate::group::test_support::{take, Events};
    use crate::resource::Resource;
    use alloc::vec;

    /// One-shot state command that moves the machine to `next` when it ends
    fn one_shot(events: &Events, cell: &StateCell<u8>, name: &str, next: Option<u8>) -> CommandRef {
        let (i, x, e) = (events.clone(), events.clone(), events.clone());
        let cell = cell.clone();
        let label = String::from(name.trim_start_matches('\\'));
        let (li, lx, le) = (label.clone(), label.clone(), label);
        Rc::new(
            Lambda::new(name)
                .set_init(move || {
                    i.borrow_mut().push(format!("{li}:init"));
                    Ok(())
                })
                .set_execute(move || {
                    x.borrow_mut().push(format!("{lx}:execute"));
                    Ok(())
                })
                .set_end(move |interrupted| {
                    e.borrow_mut().push(format!("{le}:end:{interrupted}"));
                    if let Some(next) = next {
                        cell.set(next);
                    }
                    Ok(())
                }),
        )
    }

    #[test]
    fn test_moves_between_states() {
        let events: Events = Rc::default();
        let (e0, e1) = (events.clone(), events.clone());
        let machine = StateMachine::new(0u8)
            .with_state(0, |cell, name| one_shot(&e0, cell, name, Some(1)))
            .with_state(1, |cell, name| one_shot(&e1, cell, name, None));

        machine.initialise().unwrap();
        assert!(!machine.finished().unwrap());
        machine.execute().unwrap();
        assert_eq!(take(&events), vec!["0:init", "0:execute"]);

        // state 0 finishes, its end moves to 1, which starts in the same tick
        machine.execute().unwrap();
        assert_eq!(take(&events), vec!["0:end:false", "1:init", "1:execute"]);
        assert_eq!(machine.state_cell().get(), 1);

        machine.execute().unwrap();
        assert_eq!(take(&events), vec!["1:end:false"]);
        assert!(machine.finished().unwrap());
    }

    #[test]
    fn test_external_transition_interrupts() {
        let events: Events = Rc::default();
        let (e0, e1) = (events.clone(), events.clone());
        let machine = StateMachine::new(0u8)
            .with_state(0, |cell, name| {
                let command = one_shot(&e0, cell, name, None);
                Rc::new(Lambda::from_command(command).set_finish(|| Ok(false)))
            })
            .with_state(1, |cell, name| one_shot(&e1, cell, name, None));

        machine.initialise().unwrap();
        machine.execute().unwrap();
        take(&events);

        machine.state_cell().set(1);
        assert!(!machine.finished().unwrap());
        machine.execute().unwrap();
        assert_eq!(take(&events), vec!["0:end:true", "1:init", "1:execute"]);
    }

    #[test]
    fn test_reentering_state_restarts_command() {
        let events: Events = Rc::default();
        let e0 = events.clone();
        let machine = StateMachine::new(0u8).with_state(0, |cell, name| {
            let command = one_shot(&e0, cell, name, None);
            Rc::new(Lambda::from_command(command).set_finish(|| Ok(false)))
        });
        machine.initialise().unwrap();
        machine.execute().unwrap();
        take(&events);

        machine.state_cell().set(0);
        machine.execute().unwrap();
        assert_eq!(take(&events), vec!["0:end:true", "0:init", "0:execute"]);
    }

    #[test]
    fn test_missing_state_is_reported_unwrapped() {
        let machine = StateMachine::new(3u8).with_state(0, |_, name| Rc::new(Lambda::new(name)));
        machine.initialise().unwrap();
        let error = machine.execute().unwrap_err();
        assert!(matches!(error, CommandError::MissingState { ref state } if state == "3"));
    }

    #[test]
    fn test_footprint_covers_every_state() {
        let (a, b) = (Resource::from_raw(1), Resource::from_raw(2));
        let machine = StateMachine::new(0u8)
            .with_state(0, |_, name| Rc::new(Lambda::new(name).set_requirements([a])))
            .with_state(1, |_, name| Rc::new(Lambda::new(name).set_requirements([b])));
        assert_eq!(machine.requirements().len(), 2);
        assert_eq!(machine.run_phases(), RunPhases::ACTIVE);
    }

    #[test]
    fn test_render_omits_matching_keys() {
        let machine = StateMachine::new("One")
            .with_state("One", |_, name| Rc::new(Lambda::new(name)))
            .with_state("Two", |_, name| Rc::new(Lambda::new(name)))
            .with_state("Three", |_, _| Rc::new(Lambda::new("other")));
        assert_eq!(
            machine.to_string(),
            "(state-machine One (\n\tOne\n\tTwo\n\t(Three other)))"
        );

        let one = machine.lookup(&"One").unwrap();
        assert_eq!(
            machine.unwind_stack_trace(one.id(), "ERR"),
            "(state-machine One (\n\t(One ERR)\n\tTwo\n\t(Three other)))"
        );
    }
}
