//! Closure-backed command builder
//!
//! [`Lambda`] holds each lifecycle facet as a shared closure. Builder calls
//! consume the value and return a new one; the closures themselves are
//! reference counted, so cloning a `Lambda` before building on it leaves the
//! original (and every group that already captured it) untouched.
//!
//! # Defaults
//!
//! - No requirements, run phases `ACTIVE`
//! - No-op `initialise`, `execute` and `end`
//! - `finished` is `true` (runs exactly one tick)
//! - Interruptible

use super::naming::rename;
use super::{Command, CommandId, CommandRef, CommandResult};
use crate::phase::RunPhases;
use crate::resource::{Resource, ResourceSet};
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use core::fmt;

type NameFn = Rc<dyn Fn() -> String>;
type RequirementsFn = Rc<dyn Fn() -> ResourceSet>;
type RunPhasesFn = Rc<dyn Fn() -> RunPhases>;
type Action = Rc<dyn Fn() -> CommandResult>;
type EndAction = Rc<dyn Fn(bool) -> CommandResult>;
type Predicate = Rc<dyn Fn() -> CommandResult<bool>>;
type Flag = Rc<dyn Fn() -> bool>;
type Unwinder = Rc<dyn Fn(CommandId, &str) -> String>;
type Hook = Rc<dyn Fn()>;

/// Command assembled from closures
#[derive(Clone)]
pub struct Lambda {
    name: NameFn,
    requirements: RequirementsFn,
    run_phases: RunPhasesFn,
    init: Action,
    execute: Action,
    finish: Predicate,
    end: EndAction,
    interruptible: Flag,
    /// Set when lifted from another command, renders that command's trace
    unwinder: Option<Unwinder>,
    /// Set when lifted from another command, forwards its schedule hook
    schedule_hook: Option<Hook>,
}

impl Lambda {
    /// Create a command with default behaviour
    ///
    /// # Panics
    ///
    /// Panics if `name` is blank.
    pub fn new(name: &str) -> Self {
        let name = rename(name);
        Self {
            name: Rc::new(move || name.clone()),
            requirements: Rc::new(ResourceSet::new),
            run_phases: Rc::new(RunPhases::default),
            init: Rc::new(|| Ok(())),
            execute: Rc::new(|| Ok(())),
            finish: Rc::new(|| Ok(true)),
            end: Rc::new(|_| Ok(())),
            interruptible: Rc::new(|| true),
            unwinder: None,
            schedule_hook: None,
        }
    }

    /// Lift any command into a `Lambda` that delegates every facet to it
    ///
    /// The result keeps the wrapped command's name, unwind rendering and
    /// schedule hook, so it can stand in for the original anywhere.
    pub fn from_command(command: CommandRef) -> Self {
        let name = command.clone();
        let requirements = command.clone();
        let run_phases = command.clone();
        let init = command.clone();
        let execute = command.clone();
        let finish = command.clone();
        let end = command.clone();
        let interruptible = command.clone();
        let unwinder = command.clone();
        Self {
            name: Rc::new(move || name.to_string()),
            requirements: Rc::new(move || requirements.requirements()),
            run_phases: Rc::new(move || run_phases.run_phases()),
            init: Rc::new(move || init.initialise()),
            execute: Rc::new(move || execute.execute()),
            finish: Rc::new(move || finish.finished()),
            end: Rc::new(move |interrupted| end.end(interrupted)),
            interruptible: Rc::new(move || interruptible.interruptible()),
            unwinder: Some(Rc::new(move |target, sub| {
                unwinder.unwind_stack_trace(target, sub)
            })),
            schedule_hook: Some(Rc::new(move || command.on_schedule())),
        }
    }

    /// Replace the display name
    ///
    /// # Panics
    ///
    /// Panics if `name` is blank.
    pub fn set_name(mut self, name: &str) -> Self {
        let name = rename(name);
        self.name = Rc::new(move || name.clone());
        self
    }

    /// Replace the required resources
    pub fn set_requirements<I>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = Resource>,
    {
        let requirements: ResourceSet = requirements.into_iter().collect();
        self.requirements = Rc::new(move || requirements.clone());
        self
    }

    /// Add to the required resources
    pub fn add_requirements<I>(self, requirements: I) -> Self
    where
        I: IntoIterator<Item = Resource>,
    {
        let mut union = (self.requirements)();
        union.extend(requirements);
        self.set_requirements(union)
    }

    /// Replace the run phases
    pub fn set_run_phases(mut self, run_phases: RunPhases) -> Self {
        self.run_phases = Rc::new(move || run_phases);
        self
    }

    /// Add to the run phases
    pub fn add_run_phases(self, run_phases: RunPhases) -> Self {
        let union = (self.run_phases)() | run_phases;
        self.set_run_phases(union)
    }

    /// Replace `initialise`
    pub fn set_init<F>(mut self, init: F) -> Self
    where
        F: Fn() -> CommandResult + 'static,
    {
        self.init = Rc::new(init);
        self
    }

    /// Run `init` after the current `initialise`
    pub fn add_init<F>(mut self, init: F) -> Self
    where
        F: Fn() -> CommandResult + 'static,
    {
        let old = self.init.clone();
        self.init = Rc::new(move || {
            old()?;
            init()
        });
        self
    }

    /// Replace `execute`
    pub fn set_execute<F>(mut self, execute: F) -> Self
    where
        F: Fn() -> CommandResult + 'static,
    {
        self.execute = Rc::new(execute);
        self
    }

    /// Run `execute` after the current `execute`
    pub fn add_execute<F>(mut self, execute: F) -> Self
    where
        F: Fn() -> CommandResult + 'static,
    {
        let old = self.execute.clone();
        self.execute = Rc::new(move || {
            old()?;
            execute()
        });
        self
    }

    /// Replace `finished`
    pub fn set_finish<F>(mut self, finish: F) -> Self
    where
        F: Fn() -> CommandResult<bool> + 'static,
    {
        self.finish = Rc::new(finish);
        self
    }

    /// Finish when either the current condition or `finish` holds
    pub fn add_finish<F>(mut self, finish: F) -> Self
    where
        F: Fn() -> CommandResult<bool> + 'static,
    {
        let old = self.finish.clone();
        self.finish = Rc::new(move || Ok(old()? || finish()?));
        self
    }

    /// Transform the current finish result
    pub fn map_finish<F>(mut self, finish: F) -> Self
    where
        F: Fn(bool) -> CommandResult<bool> + 'static,
    {
        let old = self.finish.clone();
        self.finish = Rc::new(move || finish(old()?));
        self
    }

    /// Replace `end`
    pub fn set_end<F>(mut self, end: F) -> Self
    where
        F: Fn(bool) -> CommandResult + 'static,
    {
        self.end = Rc::new(end);
        self
    }

    /// Run `end` after the current `end`
    pub fn add_end<F>(mut self, end: F) -> Self
    where
        F: Fn(bool) -> CommandResult + 'static,
    {
        let old = self.end.clone();
        self.end = Rc::new(move |interrupted| {
            old(interrupted)?;
            end(interrupted)
        });
        self
    }

    /// Replace `interruptible` with a constant
    pub fn set_interruptible(self, interruptible: bool) -> Self {
        self.set_interruptible_with(move || interruptible)
    }

    /// Replace `interruptible` with a dynamic condition
    pub fn set_interruptible_with<F>(mut self, interruptible: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.interruptible = Rc::new(interruptible);
        self
    }

    /// Transform the current `interruptible` result
    pub fn add_interruptible<F>(mut self, interruptible: F) -> Self
    where
        F: Fn(bool) -> bool + 'static,
    {
        let old = self.interruptible.clone();
        self.interruptible = Rc::new(move || interruptible(old()));
        self
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&(self.name)())
    }
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lambda").field("name", &(self.name)()).finish()
    }
}

impl Command for Lambda {
    fn initialise(&self) -> CommandResult {
        (self.init)()
    }

    fn execute(&self) -> CommandResult {
        (self.execute)()
    }

    fn end(&self, interrupted: bool) -> CommandResult {
        (self.end)(interrupted)
    }

    fn finished(&self) -> CommandResult<bool> {
        (self.finish)()
    }

    fn requirements(&self) -> ResourceSet {
        (self.requirements)()
    }

    fn run_phases(&self) -> RunPhases {
        (self.run_phases)()
    }

    fn interruptible(&self) -> bool {
        (self.interruptible)()
    }

    fn on_schedule(&self) {
        if let Some(hook) = &self.schedule_hook {
            hook();
        }
    }

    fn unwind_stack_trace(&self, target: CommandId, sub: &str) -> String {
        if target == self.id() {
            return sub.to_string();
        }
        match &self.unwinder {
            Some(unwinder) => unwinder(target, sub),
            None => self.to_string(),
        }
    }
}
