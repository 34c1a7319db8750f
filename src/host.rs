//! Host lifecycle driver
//!
//! Drives a user [`OpMode`] through one session and wires the scheduler
//! and input registry into each lifecycle hook.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle --init--> Init --init_loop*--> Init --start--> Active --run_loop*--> Active
//!                  \                                     |
//!                   `---------------stop----------------'--> Stopped --init--> Init
//! ```
//!
//! Every hook runs as: poll bindings, user hook, resolve the scheduler in
//! the matching phase, refresh inputs. `stop` runs the user hook and then
//! ends every command and clears bindings and inputs.

use crate::bindings::InputRegistry;
use core::fmt;
use pico_command_core::parameters::{BindingParams, ParameterStore, SchedulerParams};
use pico_command_core::traits::TimeSource;
use pico_command_core::{log_info, log_warn, Phase, Scheduler, SchedulerError};

/// Session state tracked by [`OpModeHost`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPhase {
    /// No session has started
    Idle,
    /// `init` has run, `start` has not
    Init,
    /// `start` has run
    Active,
    /// `stop` has run
    Stopped,
}

impl fmt::Display for HostPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostPhase::Idle => write!(f, "idle"),
            HostPhase::Init => write!(f, "init"),
            HostPhase::Active => write!(f, "active"),
            HostPhase::Stopped => write!(f, "stopped"),
        }
    }
}

/// Errors from the host driver
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Hook called out of lifecycle order
    #[error("cannot run {hook} while {phase}")]
    InvalidTransition {
        /// Hook that was requested
        hook: &'static str,
        /// Phase the host was in
        phase: HostPhase,
    },

    /// User hook reported a failure
    #[error("{hook} failed: {reason}")]
    Hook {
        /// Hook that failed
        hook: &'static str,
        /// Reason given by the op mode
        reason: &'static str,
    },

    /// Scheduler failure during resolve or stop
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Everything an op mode can reach from its hooks
pub struct HostContext<T: TimeSource> {
    scheduler: Scheduler,
    inputs: InputRegistry<T>,
    time: T,
}

impl<T: TimeSource + 'static> HostContext<T> {
    /// Scheduler of the session
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Input registry of the session
    pub fn inputs(&self) -> &InputRegistry<T> {
        &self.inputs
    }

    /// Time source of the session
    pub fn time(&self) -> &T {
        &self.time
    }
}

/// User program driven by [`OpModeHost`]
///
/// All hooks default to doing nothing.
///
/// ## Example
///
/// ```rust
/// use pico_command::command::Lambda;
/// use pico_command::host::{HostContext, OpMode, OpModeHost};
/// use pico_command::traits::MockTime;
/// use std::rc::Rc;
///
/// struct Drive;
///
/// impl OpMode<MockTime> for Drive {
///     fn start(&mut self, ctx: &HostContext<MockTime>) -> Result<(), &'static str> {
///         ctx.scheduler().schedule(Rc::new(Lambda::new("forward")));
///         Ok(())
///     }
/// }
///
/// let mut host = OpModeHost::new(MockTime::new());
/// let mut mode = Drive;
/// host.init(&mut mode).unwrap();
/// host.start(&mut mode).unwrap();
/// host.run_loop(&mut mode).unwrap();
/// host.stop(&mut mode).unwrap();
/// ```
pub trait OpMode<T: TimeSource> {
    /// Called once when the session is initialised
    fn init(&mut self, _ctx: &HostContext<T>) -> Result<(), &'static str> {
        Ok(())
    }

    /// Called repeatedly between `init` and `start`
    fn init_loop(&mut self, _ctx: &HostContext<T>) -> Result<(), &'static str> {
        Ok(())
    }

    /// Called once when the session starts
    fn start(&mut self, _ctx: &HostContext<T>) -> Result<(), &'static str> {
        Ok(())
    }

    /// Called repeatedly while the session is active
    fn run_loop(&mut self, _ctx: &HostContext<T>) -> Result<(), &'static str> {
        Ok(())
    }

    /// Called once when the session stops, before commands are ended
    fn stop(&mut self, _ctx: &HostContext<T>) -> Result<(), &'static str> {
        Ok(())
    }
}

/// Lifecycle driver owning the scheduler, inputs and time source
pub struct OpModeHost<T: TimeSource> {
    context: HostContext<T>,
    phase: HostPhase,
}

impl<T: TimeSource + 'static> OpModeHost<T> {
    /// Create a host with default parameters
    pub fn new(time: T) -> Self {
        Self::with_params(time, SchedulerParams::default(), BindingParams::default())
    }

    /// Create a host with explicit parameters
    pub fn with_params(time: T, scheduler: SchedulerParams, bindings: BindingParams) -> Self {
        Self {
            context: HostContext {
                scheduler: Scheduler::with_params(scheduler),
                inputs: InputRegistry::with_params(time.clone(), bindings),
                time,
            },
            phase: HostPhase::Idle,
        }
    }

    /// Create a host configured from a parameter store
    pub fn from_store(time: T, store: &ParameterStore) -> Self {
        Self::with_params(
            time,
            SchedulerParams::from_store(store),
            BindingParams::from_store(store),
        )
    }

    /// Current session state
    pub fn phase(&self) -> HostPhase {
        self.phase
    }

    /// Context handed to the op mode
    pub fn context(&self) -> &HostContext<T> {
        &self.context
    }

    /// Scheduler of the session
    pub fn scheduler(&self) -> &Scheduler {
        &self.context.scheduler
    }

    /// Input registry of the session
    pub fn inputs(&self) -> &InputRegistry<T> {
        &self.context.inputs
    }

    /// Re-read scheduler and binding parameters
    ///
    /// Scheduler parameters apply from the next tick, binding parameters to
    /// inputs created afterwards.
    pub fn reconfigure(&self, store: &ParameterStore) {
        self.context
            .scheduler
            .set_params(SchedulerParams::from_store(store));
        self.context
            .inputs
            .set_params(BindingParams::from_store(store));
    }

    /// Start a session: runs the `init` hook and resolves in `Init`
    pub fn init<M: OpMode<T> + ?Sized>(&mut self, mode: &mut M) -> Result<(), HostError> {
        self.require_phase("init", &[HostPhase::Idle, HostPhase::Stopped])?;
        log_info!("op mode init");
        self.phase = HostPhase::Init;
        self.run_hook("init", Phase::Init, |ctx| mode.init(ctx))
    }

    /// One iteration before start
    pub fn init_loop<M: OpMode<T> + ?Sized>(&mut self, mode: &mut M) -> Result<(), HostError> {
        self.require_phase("init_loop", &[HostPhase::Init])?;
        self.run_hook("init_loop", Phase::Init, |ctx| mode.init_loop(ctx))
    }

    /// Start the session: runs the `start` hook and resolves in `Active`
    pub fn start<M: OpMode<T> + ?Sized>(&mut self, mode: &mut M) -> Result<(), HostError> {
        self.require_phase("start", &[HostPhase::Init])?;
        log_info!("op mode start");
        self.phase = HostPhase::Active;
        self.run_hook("start", Phase::Active, |ctx| mode.start(ctx))
    }

    /// One iteration of the active loop
    pub fn run_loop<M: OpMode<T> + ?Sized>(&mut self, mode: &mut M) -> Result<(), HostError> {
        self.require_phase("run_loop", &[HostPhase::Active])?;
        self.run_hook("run_loop", Phase::Active, |ctx| mode.run_loop(ctx))
    }

    /// End the session
    ///
    /// Commands are ended and state is cleared even if the user hook fails;
    /// the hook failure takes precedence over a scheduler failure.
    pub fn stop<M: OpMode<T> + ?Sized>(&mut self, mode: &mut M) -> Result<(), HostError> {
        self.require_phase("stop", &[HostPhase::Init, HostPhase::Active])?;
        log_info!("op mode stop");
        self.phase = HostPhase::Stopped;

        let hook = mode
            .stop(&self.context)
            .map_err(|reason| HostError::Hook { hook: "stop", reason });
        let cleared = self.context.scheduler.clear_state();
        self.context.inputs.clear();

        hook?;
        cleared?;
        Ok(())
    }

    fn require_phase(&self, hook: &'static str, allowed: &[HostPhase]) -> Result<(), HostError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            log_warn!("rejected {} while {}", hook, self.phase);
            Err(HostError::InvalidTransition {
                hook,
                phase: self.phase,
            })
        }
    }

    fn run_hook<F>(&self, hook: &'static str, phase: Phase, run: F) -> Result<(), HostError>
    where
        F: FnOnce(&HostContext<T>) -> Result<(), &'static str>,
    {
        self.context.scheduler.poll_bindings();
        let result = run(&self.context).map_err(|reason| HostError::Hook { hook, reason });
        let resolved = self.context.scheduler.resolve(phase);
        self.context.inputs.refresh();
        result?;
        resolved?;
        Ok(())
    }
}

impl<T: TimeSource> fmt::Debug for OpModeHost<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpModeHost")
            .field("phase", &self.phase)
            .field("scheduler", &self.context.scheduler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::string::{String, ToString};
    use alloc::vec::Vec;
    use core::cell::RefCell;
    use pico_command_core::command::Lambda;
    use pico_command_core::parameters::ParamValue;
    use pico_command_core::traits::MockTime;
    use pico_command_core::{CommandRef, RunPhases};

    #[derive(Default)]
    struct Recorder {
        hooks: Vec<&'static str>,
        fail_start: bool,
    }

    impl OpMode<MockTime> for Recorder {
        fn init(&mut self, _ctx: &HostContext<MockTime>) -> Result<(), &'static str> {
            self.hooks.push("init");
            Ok(())
        }

        fn init_loop(&mut self, _ctx: &HostContext<MockTime>) -> Result<(), &'static str> {
            self.hooks.push("init_loop");
            Ok(())
        }

        fn start(&mut self, _ctx: &HostContext<MockTime>) -> Result<(), &'static str> {
            self.hooks.push("start");
            if self.fail_start {
                return Err("no start");
            }
            Ok(())
        }

        fn run_loop(&mut self, _ctx: &HostContext<MockTime>) -> Result<(), &'static str> {
            self.hooks.push("run_loop");
            Ok(())
        }

        fn stop(&mut self, _ctx: &HostContext<MockTime>) -> Result<(), &'static str> {
            self.hooks.push("stop");
            Ok(())
        }
    }

    #[test]
    fn test_lifecycle_order() {
        let mut host = OpModeHost::new(MockTime::new());
        let mut mode = Recorder::default();
        assert_eq!(host.phase(), HostPhase::Idle);

        host.init(&mut mode).unwrap();
        host.init_loop(&mut mode).unwrap();
        host.start(&mut mode).unwrap();
        host.run_loop(&mut mode).unwrap();
        host.stop(&mut mode).unwrap();

        assert_eq!(
            mode.hooks,
            ["init", "init_loop", "start", "run_loop", "stop"]
        );
        assert_eq!(host.phase(), HostPhase::Stopped);

        // a stopped host can start a new session
        host.init(&mut mode).unwrap();
        assert_eq!(host.phase(), HostPhase::Init);
    }

    #[test]
    fn test_rejects_out_of_order_hooks() {
        let mut host = OpModeHost::new(MockTime::new());
        let mut mode = Recorder::default();

        let error = host.run_loop(&mut mode).unwrap_err();
        assert!(matches!(
            error,
            HostError::InvalidTransition {
                hook: "run_loop",
                phase: HostPhase::Idle
            }
        ));
        assert_eq!(error.to_string(), "cannot run run_loop while idle");
        assert!(host.stop(&mut mode).is_err());

        host.init(&mut mode).unwrap();
        assert!(host.run_loop(&mut mode).is_err());
        assert!(host.init(&mut mode).is_err());
        assert!(mode.hooks.iter().all(|hook| *hook == "init"));
    }

    #[test]
    fn test_hook_failure_still_resolves() {
        let mut host = OpModeHost::new(MockTime::new());
        let mut mode = Recorder {
            fail_start: true,
            ..Recorder::default()
        };
        let command: CommandRef = Rc::new(Lambda::new("a").set_finish(|| Ok(false)));

        host.init(&mut mode).unwrap();
        host.scheduler().schedule(command.clone());
        let error = host.start(&mut mode).unwrap_err();

        assert_eq!(error.to_string(), "start failed: no start");
        assert_eq!(host.phase(), HostPhase::Active);
        assert!(host.scheduler().is_active(&command));
    }

    #[test]
    fn test_run_phases_follow_host_phase() {
        let mut host = OpModeHost::new(MockTime::new());
        let mut mode = Recorder::default();
        let log: Rc<RefCell<Vec<String>>> = Rc::default();
        let (a, b) = (log.clone(), log.clone());
        let active_only: CommandRef = Rc::new(
            Lambda::new("active")
                .set_execute(move || {
                    a.borrow_mut().push("active".to_string());
                    Ok(())
                })
                .set_finish(|| Ok(false)),
        );
        let during_init: CommandRef = Rc::new(
            Lambda::new("init")
                .set_run_phases(RunPhases::INIT)
                .set_execute(move || {
                    b.borrow_mut().push("init".to_string());
                    Ok(())
                }),
        );

        host.init(&mut mode).unwrap();
        host.scheduler().schedule(active_only.clone());
        host.scheduler().schedule(during_init.clone());
        host.init_loop(&mut mode).unwrap();
        assert_eq!(*log.borrow(), ["init"]);
        assert!(!host.scheduler().is_scheduled(&active_only));

        host.start(&mut mode).unwrap();
        host.scheduler().schedule(active_only.clone());
        host.run_loop(&mut mode).unwrap();
        assert_eq!(*log.borrow(), ["init", "active"]);
    }

    #[test]
    fn test_stop_clears_session() {
        let mut host = OpModeHost::new(MockTime::new());
        let mut mode = Recorder::default();
        let ended = Rc::new(RefCell::new(None));
        let flag = ended.clone();
        let command: CommandRef = Rc::new(
            Lambda::new("hold")
                .set_finish(|| Ok(false))
                .set_end(move |interrupted| {
                    *flag.borrow_mut() = Some(interrupted);
                    Ok(())
                }),
        );

        host.init(&mut mode).unwrap();
        let _button = host.inputs().boolean(|| false);
        host.start(&mut mode).unwrap();
        host.scheduler().schedule(command.clone());
        host.run_loop(&mut mode).unwrap();
        assert!(host.scheduler().is_active(&command));

        host.stop(&mut mode).unwrap();
        assert_eq!(*ended.borrow(), Some(true));
        assert!(host.scheduler().active_commands().is_empty());
        assert!(host.inputs().is_empty());
    }

    #[test]
    fn test_from_store() {
        let mut store = ParameterStore::new();
        SchedulerParams::register_defaults(&mut store).unwrap();
        BindingParams::register_defaults(&mut store).unwrap();
        store.set("SCHED_DEF_CMD", ParamValue::Bool(false)).unwrap();
        store.set("BIND_DEB_RISE", ParamValue::Int(25)).unwrap();

        let host = OpModeHost::from_store(MockTime::new(), &store);
        assert!(!host.scheduler().params().default_commands);
        assert_eq!(host.inputs().params().rising_debounce_ms, 25);

        store.set("SCHED_DEF_CMD", ParamValue::Bool(true)).unwrap();
        host.reconfigure(&store);
        assert!(host.scheduler().params().default_commands);
    }
}
