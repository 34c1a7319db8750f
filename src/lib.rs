#![cfg_attr(not(test), no_std)]

//! pico_command - Command scheduling for robot control loops
//!
//! This crate layers the host-facing pieces on top of
//! [`pico_command_core`]: debounced input bindings and the lifecycle driver
//! that runs an op mode, polls bindings and resolves the scheduler once per
//! loop iteration.
//!
//! The core crate is re-exported, so applications only depend on this one.

extern crate alloc;

// Input edge detection and scheduler bindings
pub mod bindings;

// Op mode lifecycle driver
pub mod host;

pub use pico_command_core::{
    command, group, log_debug, log_error, log_info, log_trace, log_warn, parameters, phase,
    resource, scheduler, traits, util,
};
pub use pico_command_core::{
    Binding, Command, CommandError, CommandId, CommandRef, CommandResult, Compose, Phase,
    Resource, ResourceSet, RunPhases, Scheduler, SchedulerError, WeakScheduler,
};

pub use bindings::{BoundBoolean, BoundConditional, InputRegistry};
pub use host::{HostContext, HostError, HostPhase, OpMode, OpModeHost};
