//! Branch chosen once per run

use crate::command::{Command, CommandId, CommandRef, CommandResult, LifecyclePhase};
use crate::phase::RunPhases;
use crate::resource::ResourceSet;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use core::cell::Cell;
use core::fmt;

/// Runs one of two branches, picked by `condition` at `initialise()`
///
/// The footprint is the union of both branches, so admission is decided
/// conservatively for whichever branch ends up running.
pub struct IfElse {
    condition: Rc<dyn Fn() -> bool>,
    on_true: CommandRef,
    on_false: CommandRef,
    chose_true: Cell<bool>,
    requirements: ResourceSet,
    run_phases: RunPhases,
}

impl IfElse {
    /// Create a branch between `on_true` and `on_false`
    pub fn new<F>(condition: F, on_true: CommandRef, on_false: CommandRef) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        let mut requirements = on_true.requirements();
        requirements.extend(on_false.requirements());
        let run_phases = on_true.run_phases() | on_false.run_phases();
        Self {
            condition: Rc::new(condition),
            on_true,
            on_false,
            chose_true: Cell::new(true),
            requirements,
            run_phases,
        }
    }

    /// Branch picked at the last `initialise()`
    fn chosen(&self) -> &CommandRef {
        if self.chose_true.get() {
            &self.on_true
        } else {
            &self.on_false
        }
    }

    fn wrap<T>(&self, result: CommandResult<T>, phase: LifecyclePhase) -> CommandResult<T> {
        result.map_err(|e| e.unwind(&**self.chosen(), self, phase))
    }

    fn render(&self, on_true: String, on_false: String) -> String {
        format!("(? {} {} {})", self.chose_true.get(), on_true, on_false)
    }
}

impl fmt::Display for IfElse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(self.on_true.to_string(), self.on_false.to_string()))
    }
}

impl fmt::Debug for IfElse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IfElse")
            .field("chose_true", &self.chose_true.get())
            .finish()
    }
}

impl Command for IfElse {
    fn initialise(&self) -> CommandResult {
        self.chose_true.set((self.condition)());
        self.wrap(self.chosen().initialise(), LifecyclePhase::Initialise)
    }

    fn execute(&self) -> CommandResult {
        self.wrap(self.chosen().execute(), LifecyclePhase::Execute)
    }

    fn end(&self, interrupted: bool) -> CommandResult {
        self.wrap(self.chosen().end(interrupted), LifecyclePhase::End)
    }

    fn finished(&self) -> CommandResult<bool> {
        self.wrap(self.chosen().finished(), LifecyclePhase::Finished)
    }

    fn requirements(&self) -> ResourceSet {
        self.requirements.clone()
    }

    fn run_phases(&self) -> RunPhases {
        self.run_phases
    }

    fn interruptible(&self) -> bool {
        self.chosen().interruptible()
    }

    fn unwind_stack_trace(&self, target: CommandId, sub: &str) -> String {
        if target == self.id() {
            return String::from(sub);
        }
        self.render(
            self.on_true.unwind_stack_trace(target, sub),
            self.on_false.unwind_stack_trace(target, sub),
        )
    }
}
