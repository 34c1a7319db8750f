//! Lambda builder whose closures share a state value
//!
//! Useful when several facets need the same scratch data (a counter, a
//! target position) without each closure capturing its own `Rc`.

use super::{Command, CommandResult, Lambda};
use crate::phase::RunPhases;
use crate::resource::{Resource, ResourceSet};
use alloc::rc::Rc;
use core::fmt;

/// [`Lambda`] whose closures receive a shared `&S`
pub struct StatefulLambda<S> {
    state: Rc<S>,
    lambda: Lambda,
}

impl<S> Clone for StatefulLambda<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            lambda: self.lambda.clone(),
        }
    }
}

impl<S: 'static> StatefulLambda<S> {
    /// Create a command with default behaviour around `state`
    ///
    /// # Panics
    ///
    /// Panics if `name` is blank.
    pub fn new(name: &str, state: S) -> Self {
        Self {
            state: Rc::new(state),
            lambda: Lambda::new(name),
        }
    }

    /// Shared state
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Drop the state handle and keep the underlying builder
    pub fn into_lambda(self) -> Lambda {
        self.lambda
    }

    fn map(self, build: impl FnOnce(Lambda, Rc<S>) -> Lambda) -> Self {
        let lambda = build(self.lambda, self.state.clone());
        Self {
            state: self.state,
            lambda,
        }
    }

    /// Replace `initialise`
    pub fn set_init<F>(self, init: F) -> Self
    where
        F: Fn(&S) -> CommandResult + 'static,
    {
        self.map(|lambda, state| lambda.set_init(move || init(&*state)))
    }

    /// Run `init` after the current `initialise`
    pub fn add_init<F>(self, init: F) -> Self
    where
        F: Fn(&S) -> CommandResult + 'static,
    {
        self.map(|lambda, state| lambda.add_init(move || init(&*state)))
    }

    /// Replace `execute`
    pub fn set_execute<F>(self, execute: F) -> Self
    where
        F: Fn(&S) -> CommandResult + 'static,
    {
        self.map(|lambda, state| lambda.set_execute(move || execute(&*state)))
    }

    /// Run `execute` after the current `execute`
    pub fn add_execute<F>(self, execute: F) -> Self
    where
        F: Fn(&S) -> CommandResult + 'static,
    {
        self.map(|lambda, state| lambda.add_execute(move || execute(&*state)))
    }

    /// Replace `finished`
    pub fn set_finish<F>(self, finish: F) -> Self
    where
        F: Fn(&S) -> CommandResult<bool> + 'static,
    {
        self.map(|lambda, state| lambda.set_finish(move || finish(&*state)))
    }

    /// Finish when either the current condition or `finish` holds
    pub fn add_finish<F>(self, finish: F) -> Self
    where
        F: Fn(&S) -> CommandResult<bool> + 'static,
    {
        self.map(|lambda, state| lambda.add_finish(move || finish(&*state)))
    }

    /// Replace `end`
    pub fn set_end<F>(self, end: F) -> Self
    where
        F: Fn(&S, bool) -> CommandResult + 'static,
    {
        self.map(|lambda, state| lambda.set_end(move |interrupted| end(&*state, interrupted)))
    }

    /// Run `end` after the current `end`
    pub fn add_end<F>(self, end: F) -> Self
    where
        F: Fn(&S, bool) -> CommandResult + 'static,
    {
        self.map(|lambda, state| lambda.add_end(move |interrupted| end(&*state, interrupted)))
    }

    /// Replace `interruptible` with a condition over the state
    pub fn set_interruptible_with<F>(self, interruptible: F) -> Self
    where
        F: Fn(&S) -> bool + 'static,
    {
        self.map(|lambda, state| lambda.set_interruptible_with(move || interruptible(&*state)))
    }

    /// Replace the required resources
    pub fn set_requirements<I>(self, requirements: I) -> Self
    where
        I: IntoIterator<Item = Resource>,
    {
        self.map(|lambda, _| lambda.set_requirements(requirements))
    }

    /// Replace the run phases
    pub fn set_run_phases(self, run_phases: RunPhases) -> Self {
        self.map(|lambda, _| lambda.set_run_phases(run_phases))
    }
}

impl<S> fmt::Display for StatefulLambda<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.lambda, f)
    }
}

impl<S> Command for StatefulLambda<S> {
    fn initialise(&self) -> CommandResult {
        self.lambda.initialise()
    }

    fn execute(&self) -> CommandResult {
        self.lambda.execute()
    }

    fn end(&self, interrupted: bool) -> CommandResult {
        self.lambda.end(interrupted)
    }

    fn finished(&self) -> CommandResult<bool> {
        self.lambda.finished()
    }

    fn requirements(&self) -> ResourceSet {
        self.lambda.requirements()
    }

    fn run_phases(&self) -> RunPhases {
        self.lambda.run_phases()
    }

    fn interruptible(&self) -> bool {
        self.lambda.interruptible()
    }
}
