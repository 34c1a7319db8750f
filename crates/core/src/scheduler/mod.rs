//! Command scheduler for tick-driven control loops
//!
//! The scheduler is the single authority over resource ownership. Commands
//! are queued with [`Scheduler::schedule`] and admitted, evicted, executed
//! and ended by [`Scheduler::resolve`], which the host calls once per
//! control-loop iteration.
//!
//! # Components
//!
//! - [`Scheduler`]: Shared handle to the scheduler state
//! - [`WeakScheduler`]: Non-owning handle for commands that schedule others
//! - [`Binding`]: Poll closures run before every resolution pass
//! - [`SchedulerError`]: Lifecycle failures surfaced from a tick
//!
//! # Resolution order
//!
//! 1. Finish scan: active commands reporting `finished()` are queued to end
//! 2. Endings: queued commands are ended and release their resources
//! 3. Default commands: idle, enabled resources get their default scheduled
//! 4. Admission: pending commands claim free resources or evict
//!    interruptible holders; a non-interruptible holder refuses the candidate
//! 5. Endings again, for the evictions queued by admission
//! 6. Execute: every active command runs once
//!
//! # Example
//!
//! ```rust
//! use pico_command_core::command::Lambda;
//! use pico_command_core::{CommandRef, Phase, Scheduler};
//! use std::rc::Rc;
//!
//! let scheduler = Scheduler::new();
//! let drive = scheduler.register_resource("drive");
//!
//! let command: CommandRef = Rc::new(
//!     Lambda::new("forward")
//!         .set_requirements([drive])
//!         .set_finish(|| Ok(false)),
//! );
//! scheduler.schedule(command.clone());
//! scheduler.resolve(Phase::Active).unwrap();
//!
//! assert!(scheduler.is_active(&command));
//! assert!(scheduler.owner_of(drive).is_some());
//! ```

pub mod binding;
pub mod error;

pub use binding::Binding;
pub use error::SchedulerError;

use crate::command::{CommandError, CommandId, CommandRef, LifecyclePhase};
use crate::parameters::SchedulerParams;
use crate::phase::Phase;
use crate::resource::{Resource, ResourceEntry, ResourceSet};
use alloc::collections::BTreeMap;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::mem;

fn same(a: &CommandRef, b: &CommandRef) -> bool {
    CommandId::of(a) == CommandId::of(b)
}

#[derive(Default)]
struct SchedulerState {
    params: SchedulerParams,
    /// Pending commands, in scheduling order
    to_schedule: Vec<CommandRef>,
    /// Set while the admission pass walks `to_schedule`
    admitting: bool,
    /// Pending commands cancelled during admission, dropped when it ends
    cancelled: Vec<CommandRef>,
    /// Queued endings as (interrupted, command)
    to_end: Vec<(bool, CommandRef)>,
    /// Current owner of each claimed resource
    requirement_map: BTreeMap<Resource, CommandRef>,
    default_commands: BTreeMap<Resource, CommandRef>,
    /// Admitted commands, in admission order
    active: Vec<CommandRef>,
    bindings: Vec<Binding>,
    resources: BTreeMap<Resource, ResourceEntry>,
    next_resource: u32,
}

impl SchedulerState {
    fn is_active(&self, command: &CommandRef) -> bool {
        self.active.iter().any(|c| same(c, command))
    }

    fn is_pending(&self, command: &CommandRef) -> bool {
        self.to_schedule.iter().any(|c| same(c, command)) && !self.is_cancelled(command)
    }

    fn is_cancelled(&self, command: &CommandRef) -> bool {
        self.cancelled.iter().any(|c| same(c, command))
    }

    /// Replace the pending list once admission is done, dropping cancellations
    fn finish_admission(&mut self, mut pending: Vec<CommandRef>) {
        let cancelled = mem::take(&mut self.cancelled);
        pending.retain(|c| !cancelled.iter().any(|x| same(x, c)));
        self.to_schedule = pending;
        self.admitting = false;
    }

    fn release(&mut self, command: &CommandRef) {
        self.requirement_map.retain(|_, owner| !same(owner, command));
        self.active.retain(|c| !same(c, command));
    }
}

/// Shared handle to a command scheduler
///
/// Cloning the handle shares the same scheduler. Lifecycle calls into
/// commands are made without any internal borrow held, so commands may call
/// back into the scheduler (`schedule`, `cancel`, queries) from any hook.
#[derive(Clone, Default)]
pub struct Scheduler {
    state: Rc<RefCell<SchedulerState>>,
}

/// Non-owning scheduler handle
#[derive(Clone, Default)]
pub struct WeakScheduler {
    state: Weak<RefCell<SchedulerState>>,
}

impl WeakScheduler {
    /// Recover the scheduler if it is still alive
    pub fn upgrade(&self) -> Option<Scheduler> {
        self.state.upgrade().map(|state| Scheduler { state })
    }
}

impl fmt::Debug for WeakScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakScheduler")
            .field("alive", &(self.state.strong_count() > 0))
            .finish()
    }
}

impl Scheduler {
    /// Create a scheduler with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scheduler with explicit parameters
    pub fn with_params(params: SchedulerParams) -> Self {
        let scheduler = Self::default();
        scheduler.state.borrow_mut().params = params;
        scheduler
    }

    /// Current parameters
    pub fn params(&self) -> SchedulerParams {
        self.state.borrow().params
    }

    /// Replace the parameters, effective from the next tick
    pub fn set_params(&self, params: SchedulerParams) {
        self.state.borrow_mut().params = params;
    }

    /// Non-owning handle to this scheduler
    pub fn downgrade(&self) -> WeakScheduler {
        WeakScheduler {
            state: Rc::downgrade(&self.state),
        }
    }

    // ------------------------------------------------------------------
    // Resource registry
    // ------------------------------------------------------------------

    /// Issue a fresh resource identity. Resources start enabled.
    pub fn register_resource(&self, name: &str) -> Resource {
        let mut state = self.state.borrow_mut();
        let resource = Resource::from_raw(state.next_resource);
        state.next_resource += 1;
        state.resources.insert(
            resource,
            ResourceEntry {
                name: String::from(name),
                enabled: true,
            },
        );
        log_debug!("registered {} ({})", resource, name);
        resource
    }

    /// Remove a resource from the registry
    ///
    /// Its default command is dropped and its current holder, if any, is
    /// cancelled.
    pub fn deregister_resource(&self, resource: Resource) {
        let holder = {
            let mut state = self.state.borrow_mut();
            state.resources.remove(&resource);
            state.default_commands.remove(&resource);
            state.requirement_map.get(&resource).cloned()
        };
        if let Some(holder) = holder {
            self.cancel(&holder);
        }
        log_debug!("deregistered {}", resource);
    }

    /// Enable or disable a resource. Disabled resources never receive their
    /// default command.
    pub fn set_resource_enabled(&self, resource: Resource, enabled: bool) {
        if let Some(entry) = self.state.borrow_mut().resources.get_mut(&resource) {
            entry.enabled = enabled;
        }
    }

    /// `false` for unknown resources
    pub fn is_resource_enabled(&self, resource: Resource) -> bool {
        self.state
            .borrow()
            .resources
            .get(&resource)
            .is_some_and(|entry| entry.enabled)
    }

    /// Name given at registration
    pub fn resource_name(&self, resource: Resource) -> Option<String> {
        self.state
            .borrow()
            .resources
            .get(&resource)
            .map(|entry| entry.name.clone())
    }

    /// All registered resources, in registration order
    pub fn resources(&self) -> Vec<Resource> {
        self.state.borrow().resources.keys().copied().collect()
    }

    /// Set or clear the default command of a resource
    pub fn set_default_command(&self, resource: Resource, command: Option<CommandRef>) {
        let mut state = self.state.borrow_mut();
        match command {
            Some(command) => {
                state.default_commands.insert(resource, command);
            }
            None => {
                state.default_commands.remove(&resource);
            }
        }
    }

    /// Default command of a resource
    pub fn default_command(&self, resource: Resource) -> Option<CommandRef> {
        self.state.borrow().default_commands.get(&resource).cloned()
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    /// Queue a command for admission on the next tick
    ///
    /// The command's `on_schedule` hook always runs; the command itself is
    /// only queued if it is neither active nor already pending.
    pub fn schedule(&self, command: CommandRef) {
        command.on_schedule();
        let mut state = self.state.borrow_mut();
        if state.is_cancelled(&command) {
            state.cancelled.retain(|c| !same(c, &command));
        } else if !state.is_active(&command) && !state.is_pending(&command) {
            state.to_schedule.push(command);
        }
    }

    /// Cancel a command
    ///
    /// Active commands are ended with `interrupted = true` on the next
    /// tick. Pending commands are dropped without any lifecycle call; while
    /// the admission pass is running they are only marked, and dropped once
    /// it is done.
    pub fn cancel(&self, command: &CommandRef) {
        let mut state = self.state.borrow_mut();
        if state.is_active(command) {
            state.to_end.push((true, command.clone()));
        } else if state.admitting {
            if state.is_pending(command) {
                state.cancelled.push(command.clone());
            }
        } else {
            state.to_schedule.retain(|c| !same(c, command));
        }
    }

    /// `true` if the command is active or pending
    pub fn is_scheduled(&self, command: &CommandRef) -> bool {
        let state = self.state.borrow();
        state.is_active(command) || state.is_pending(command)
    }

    /// `true` if the command is active
    pub fn is_active(&self, command: &CommandRef) -> bool {
        self.state.borrow().is_active(command)
    }

    /// Snapshot of the active commands, in admission order
    pub fn active_commands(&self) -> Vec<CommandRef> {
        self.state.borrow().active.clone()
    }

    /// Command currently owning `resource`
    pub fn owner_of(&self, resource: Resource) -> Option<CommandRef> {
        self.state.borrow().requirement_map.get(&resource).cloned()
    }

    // ------------------------------------------------------------------
    // Bindings
    // ------------------------------------------------------------------

    /// Register a binding, polled by every [`Scheduler::poll_bindings`]
    pub fn register_binding(&self, binding: Binding) {
        self.state.borrow_mut().bindings.push(binding);
    }

    /// Number of registered bindings
    pub fn binding_count(&self) -> usize {
        self.state.borrow().bindings.len()
    }

    /// Poll every registered binding once
    ///
    /// Bindings registered while polling are kept and first polled on the
    /// next call.
    pub fn poll_bindings(&self) {
        let mut bindings = mem::take(&mut self.state.borrow_mut().bindings);
        for binding in bindings.iter_mut() {
            binding.poll(self);
        }
        let mut state = self.state.borrow_mut();
        bindings.append(&mut state.bindings);
        state.bindings = bindings;
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Run one resolution pass for the given host phase
    ///
    /// The pass stops at the first failing lifecycle call. The failing
    /// command has already released its resources and left the active set
    /// when the error is returned; commands not yet visited this pass are
    /// visited again on the next tick.
    pub fn resolve(&self, phase: Phase) -> Result<(), SchedulerError> {
        self.finish_scan()?;
        self.apply_endings()?;
        self.inject_defaults();
        self.admit(phase)?;
        self.apply_endings()?;
        self.execute_active()
    }

    /// End everything and reset the scheduler for a new session
    ///
    /// Finished commands end normally, every other active command is ended
    /// with `interrupted = true`. Pending commands, ownership, default
    /// commands and bindings are then cleared. Registered resources survive.
    /// Every command is ended even if an earlier one fails; the first
    /// failure is returned after the state has been cleared.
    pub fn clear_state(&self) -> Result<(), SchedulerError> {
        let mut first = self.finish_scan().err();
        first = first.or(self.drain_endings());

        let remaining = self.active_commands();
        self.state
            .borrow_mut()
            .to_end
            .extend(remaining.into_iter().map(|command| (true, command)));
        first = first.or(self.drain_endings());

        let (bindings, defaults) = {
            let mut state = self.state.borrow_mut();
            state.to_schedule.clear();
            state.cancelled.clear();
            state.to_end.clear();
            state.requirement_map.clear();
            state.active.clear();
            (
                mem::take(&mut state.bindings),
                mem::take(&mut state.default_commands),
            )
        };
        // dropped outside the borrow, their destructors may reach the scheduler
        drop(bindings);
        drop(defaults);

        log_debug!("scheduler state cleared");
        match first {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Apply endings until the queue is empty, keeping the first failure
    fn drain_endings(&self) -> Option<SchedulerError> {
        let mut first = None;
        while let Err(error) = self.apply_endings() {
            first = first.or(Some(error));
        }
        first
    }

    fn fail(
        &self,
        phase: LifecyclePhase,
        command: &CommandRef,
        error: CommandError,
    ) -> SchedulerError {
        self.state.borrow_mut().release(command);
        let error = SchedulerError::lifecycle(phase, command, error);
        log_error!("{}", error);
        error
    }

    fn finish_scan(&self) -> Result<(), SchedulerError> {
        for command in self.active_commands() {
            match command.finished() {
                Ok(true) => self.state.borrow_mut().to_end.push((false, command)),
                Ok(false) => {}
                Err(error) => return Err(self.fail(LifecyclePhase::Finished, &command, error)),
            }
        }
        Ok(())
    }

    fn apply_endings(&self) -> Result<(), SchedulerError> {
        let mut index = 0;
        loop {
            let entry = self.state.borrow().to_end.get(index).cloned();
            let Some((interrupted, command)) = entry else {
                break;
            };
            index += 1;

            if !self.is_active(&command) {
                continue;
            }

            log_debug!("ending {} (interrupted: {})", command, interrupted);
            let result = command.end(interrupted);
            if let Err(error) = result {
                self.state.borrow_mut().to_end.drain(..index);
                return Err(self.fail(LifecyclePhase::End, &command, error));
            }
            self.state.borrow_mut().release(&command);
        }
        self.state.borrow_mut().to_end.clear();
        Ok(())
    }

    fn inject_defaults(&self) {
        let pending = {
            let state = self.state.borrow();
            if !state.params.default_commands || state.default_commands.is_empty() {
                return;
            }
            state.to_schedule.clone()
        };
        let incoming: ResourceSet = pending.iter().flat_map(|c| c.requirements()).collect();

        let defaults: Vec<CommandRef> = {
            let state = self.state.borrow();
            state
                .default_commands
                .iter()
                .filter(|(resource, _)| {
                    state.resources.get(resource).is_some_and(|entry| entry.enabled)
                        && !state.requirement_map.contains_key(resource)
                        && !incoming.contains(resource)
                })
                .map(|(_, command)| command.clone())
                .collect()
        };

        for command in defaults {
            log_trace!("scheduling default command {}", command);
            self.schedule(command);
        }
    }

    fn admit(&self, phase: Phase) -> Result<(), SchedulerError> {
        self.state.borrow_mut().admitting = true;
        let mut deferred: Vec<CommandRef> = Vec::new();
        let mut index = 0;
        loop {
            let candidate = {
                let state = self.state.borrow();
                state
                    .to_schedule
                    .get(index)
                    .map(|candidate| (candidate.clone(), state.is_cancelled(candidate)))
            };
            let Some((candidate, cancelled)) = candidate else {
                break;
            };
            index += 1;

            if cancelled {
                log_trace!("dropping cancelled {}", candidate);
                continue;
            }

            if self.is_active(&candidate) {
                continue;
            }
            if !candidate.run_phases().allows(phase) {
                log_trace!("skipping {} outside {}", candidate, phase);
                continue;
            }

            let requirements = candidate.requirements();
            let mut holders: Vec<CommandRef> = Vec::new();
            {
                let state = self.state.borrow();
                for resource in &requirements {
                    if let Some(holder) = state.requirement_map.get(resource) {
                        if !holders.iter().any(|h| same(h, holder)) {
                            holders.push(holder.clone());
                        }
                    }
                }
            }

            if holders.is_empty() {
                {
                    let mut state = self.state.borrow_mut();
                    for resource in &requirements {
                        state.requirement_map.insert(*resource, candidate.clone());
                    }
                    state.active.push(candidate.clone());
                }
                log_debug!("admitted {}", candidate);
                if let Err(error) = candidate.initialise() {
                    {
                        let mut state = self.state.borrow_mut();
                        let at = index.min(state.to_schedule.len());
                        let rest = state.to_schedule.split_off(at);
                        deferred.extend(rest);
                        state.finish_admission(deferred);
                    }
                    return Err(self.fail(LifecyclePhase::Initialise, &candidate, error));
                }
                continue;
            }

            if let Some(blocker) = holders.iter().find(|holder| !holder.interruptible()) {
                log_debug!("refused {}: held by non-interruptible {}", candidate, blocker);
                continue;
            }

            {
                let mut state = self.state.borrow_mut();
                for holder in holders {
                    log_debug!("evicting {} for {}", holder, candidate);
                    state.to_end.push((true, holder));
                }
            }
            deferred.push(candidate);
        }

        self.state.borrow_mut().finish_admission(deferred);
        Ok(())
    }

    fn execute_active(&self) -> Result<(), SchedulerError> {
        for command in self.active_commands() {
            if let Err(error) = command.execute() {
                return Err(self.fail(LifecyclePhase::Execute, &command, error));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Scheduler")
            .field("params", &state.params)
            .field("pending", &state.to_schedule.len())
            .field("active", &state.active.len())
            .field("owned", &state.requirement_map.len())
            .field("defaults", &state.default_commands.len())
            .field("bindings", &state.bindings.len())
            .field("resources", &state.resources.len())
            .finish()
    }
}
