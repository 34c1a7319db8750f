//! pico_command_core - Pure no_std command scheduling for robot control loops
//!
//! This crate contains the scheduler and the command composition algebra.
//! Everything runs single-threaded and tick-driven: the host calls
//! [`scheduler::Scheduler::resolve`] once per control-loop iteration and the
//! scheduler walks every active command through its lifecycle.
//!
//! # Design Principles
//!
//! - **Pure no_std**: Only `alloc`; the wall-clock time source is the one
//!   item behind the `std` feature
//! - **Trait abstractions**: Commands and time sources are traits, concrete
//!   combinators are plain structs implementing them
//! - **Shared, not owned**: Commands are handed around as `Rc<dyn Command>`
//!   and keep their runtime state behind `Cell`/`RefCell`
//!
//! # Modules
//!
//! - [`command`]: Command contract, Lambda builders, naming and unwind errors
//! - [`group`]: Group base plus Sequential, Parallel, Race and Advancing
//! - [`util`]: IfElse, SelectionCommand, StateMachine and Wait
//! - [`scheduler`]: Resource ownership and the per-tick resolution pass
//! - [`resource`]: Resource identities
//! - [`phase`]: Host phases and run-phase sets
//! - [`parameters`]: Parameter store and scheduler/binding parameter blocks
//! - [`traits`]: Platform-agnostic trait abstractions (TimeSource)
//! - [`logging`]: `log_*!` macros

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
pub mod logging;

pub mod command;
pub mod group;
pub mod parameters;
pub mod phase;
pub mod resource;
pub mod scheduler;
pub mod traits;
pub mod util;

pub use command::{Command, CommandError, CommandId, CommandRef, CommandResult, Compose};
pub use phase::{Phase, RunPhases};
pub use resource::{Resource, ResourceSet};
pub use scheduler::{Binding, Scheduler, SchedulerError, WeakScheduler};
