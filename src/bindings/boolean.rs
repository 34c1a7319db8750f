//! Debounced boolean inputs

use super::{InputRegistry, Refresh, WeakRegistry};
use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt;
use core::time::Duration;
use pico_command_core::command::Lambda;
use pico_command_core::scheduler::{Binding, Scheduler};
use pico_command_core::traits::TimeSource;
use pico_command_core::{Command, CommandRef};

type Source = Rc<dyn Fn() -> bool>;

struct BoundState<T: TimeSource> {
    source: Source,
    time: T,
    rising: Duration,
    falling: Duration,
    previous: Cell<bool>,
    current: Cell<bool>,
    toggle_true: Cell<bool>,
    toggle_false: Cell<bool>,
    /// Last time the raw sample agreed with the debounced state (us)
    marker_us: Cell<u64>,
    valid: Cell<bool>,
    registry: WeakRegistry<T>,
}

impl<T: TimeSource> BoundState<T> {
    fn update(&self) {
        let sample = (self.source)();
        let current = self.current.get();
        let now = self.time.now_us();
        self.previous.set(current);

        if !current && sample {
            if self.time.has_elapsed(self.marker_us.get(), self.rising) {
                self.current.set(true);
                self.toggle_true.set(!self.toggle_true.get());
                self.marker_us.set(now);
            }
        } else if current && !sample {
            if self.time.has_elapsed(self.marker_us.get(), self.falling) {
                self.current.set(false);
                self.toggle_false.set(!self.toggle_false.get());
                self.marker_us.set(now);
            }
        } else {
            self.marker_us.set(now);
        }
    }

    fn state(&self) -> bool {
        if !self.valid.get() {
            self.update();
            self.valid.set(true);
        }
        self.current.get()
    }
}

impl<T: TimeSource> Refresh for BoundState<T> {
    fn invalidate(&self) {
        self.valid.set(false);
    }

    fn sample(&self) {
        self.state();
    }
}

/// Debounced boolean input with edge and toggle detection
///
/// The input samples its source at most once between invalidations. A
/// change only becomes visible once the raw value has disagreed with the
/// debounced state for the whole debounce window of that direction.
///
/// Clones share the same state. Builder methods (`debounce*`, `and`, `or`,
/// `xor`, `not`) return new inputs registered with the same registry.
pub struct BoundBoolean<T: TimeSource> {
    state: Rc<BoundState<T>>,
}

impl<T: TimeSource> Clone for BoundBoolean<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: TimeSource + 'static> BoundBoolean<T> {
    pub(super) fn create(
        registry: &InputRegistry<T>,
        source: Source,
        rising: Duration,
        falling: Duration,
    ) -> Self {
        let input = Self::build(registry.time().clone(), registry.downgrade(), source, rising, falling);
        registry.register(input.state.clone());
        input
    }

    fn build(time: T, registry: WeakRegistry<T>, source: Source, rising: Duration, falling: Duration) -> Self {
        let initial = source();
        let marker = time.now_us();
        Self {
            state: Rc::new(BoundState {
                source,
                time,
                rising,
                falling,
                previous: Cell::new(initial),
                current: Cell::new(initial),
                toggle_true: Cell::new(initial),
                toggle_false: Cell::new(initial),
                marker_us: Cell::new(marker),
                valid: Cell::new(false),
                registry,
            }),
        }
    }

    /// New input over `source`, registered alongside this one
    fn derive(&self, source: Source, rising: Duration, falling: Duration) -> Self {
        match self.state.registry.upgrade() {
            Some(registry) => Self::create(&registry, source, rising, falling),
            None => Self::build(
                self.state.time.clone(),
                self.state.registry.clone(),
                source,
                rising,
                falling,
            ),
        }
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    /// Debounced state, sampling the source if invalidated
    pub fn state(&self) -> bool {
        self.state.state()
    }

    /// `true` on the sample where the state became true
    pub fn rising_edge(&self) -> bool {
        self.state() && !self.state.previous.get()
    }

    /// `true` on the sample where the state became false
    pub fn falling_edge(&self) -> bool {
        !self.state() && self.state.previous.get()
    }

    /// Flips on every rising change, starts at the initial state
    pub fn toggle_true_state(&self) -> bool {
        self.state();
        self.state.toggle_true.get()
    }

    /// Flips on every falling change, starts at the initial state
    pub fn toggle_false_state(&self) -> bool {
        self.state();
        self.state.toggle_false.get()
    }

    /// Make the next read sample the source again
    pub fn invalidate(&self) {
        self.state.invalidate();
    }

    /// Rising debounce window
    pub fn rising_debounce(&self) -> Duration {
        self.state.rising
    }

    /// Falling debounce window
    pub fn falling_debounce(&self) -> Duration {
        self.state.falling
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    /// Same source, `window` applied to both directions
    pub fn debounce(&self, window: Duration) -> Self {
        self.derive(self.state.source.clone(), window, window)
    }

    /// Same source, new rising window
    pub fn debounce_rising(&self, window: Duration) -> Self {
        self.derive(self.state.source.clone(), window, self.state.falling)
    }

    /// Same source, new falling window
    pub fn debounce_falling(&self, window: Duration) -> Self {
        self.derive(self.state.source.clone(), self.state.rising, window)
    }

    /// Both inputs true
    pub fn and(&self, other: &BoundBoolean<T>) -> Self {
        let (a, b) = (self.clone(), other.clone());
        self.derive(Rc::new(move || a.state() && b.state()), Duration::ZERO, Duration::ZERO)
    }

    /// Either input true
    pub fn or(&self, other: &BoundBoolean<T>) -> Self {
        let (a, b) = (self.clone(), other.clone());
        self.derive(Rc::new(move || a.state() || b.state()), Duration::ZERO, Duration::ZERO)
    }

    /// Exactly one input true
    pub fn xor(&self, other: &BoundBoolean<T>) -> Self {
        let (a, b) = (self.clone(), other.clone());
        self.derive(Rc::new(move || a.state() ^ b.state()), Duration::ZERO, Duration::ZERO)
    }

    /// Inverse of this input, keeping its debounce windows
    #[allow(clippy::should_implement_trait)]
    pub fn not(&self) -> Self {
        let a = self.clone();
        self.derive(Rc::new(move || !a.state()), self.state.rising, self.state.falling)
    }

    // ------------------------------------------------------------------
    // Command binders
    // ------------------------------------------------------------------

    /// Schedule `command` when the state becomes true
    pub fn on_true(&self, scheduler: &Scheduler, command: CommandRef) -> &Self {
        let input = self.clone();
        scheduler.register_binding(Binding::run_command(move || input.rising_edge(), command));
        self
    }

    /// Schedule `command` when the state becomes false
    pub fn on_false(&self, scheduler: &Scheduler, command: CommandRef) -> &Self {
        let input = self.clone();
        scheduler.register_binding(Binding::run_command(move || input.falling_edge(), command));
        self
    }

    /// Cancel `command` when the state becomes true
    pub fn cancel_on_true(&self, scheduler: &Scheduler, command: CommandRef) -> &Self {
        let input = self.clone();
        scheduler.register_binding(Binding::cancel_command(move || input.rising_edge(), command));
        self
    }

    /// Cancel `command` when the state becomes false
    pub fn cancel_on_false(&self, scheduler: &Scheduler, command: CommandRef) -> &Self {
        let input = self.clone();
        scheduler.register_binding(Binding::cancel_command(move || input.falling_edge(), command));
        self
    }

    /// Schedule `command` when the state becomes true, end it early once
    /// the state is false
    pub fn while_true(&self, scheduler: &Scheduler, command: CommandRef) -> &Self {
        let (trigger, hold) = (self.clone(), self.clone());
        let bound: CommandRef = Rc::new(Lambda::from_command(command).add_finish(move || Ok(!hold.state())));
        scheduler.register_binding(Binding::run_command(move || trigger.rising_edge(), bound));
        self
    }

    /// Schedule `command` when the state becomes false, end it early once
    /// the state is true
    pub fn while_false(&self, scheduler: &Scheduler, command: CommandRef) -> &Self {
        let (trigger, hold) = (self.clone(), self.clone());
        let bound: CommandRef = Rc::new(Lambda::from_command(command).add_finish(move || Ok(hold.state())));
        scheduler.register_binding(Binding::run_command(move || trigger.falling_edge(), bound));
        self
    }

    /// Schedule `command` when the state becomes true and restart it each
    /// time it finishes, until the state is false
    pub fn until_false(&self, scheduler: &Scheduler, command: CommandRef) -> &Self {
        let (trigger, hold) = (self.clone(), self.clone());
        let bound = repeat_until(command, move || !hold.state());
        scheduler.register_binding(Binding::run_command(move || trigger.rising_edge(), bound));
        self
    }

    /// Schedule `command` when the state becomes false and restart it each
    /// time it finishes, until the state is true
    pub fn until_true(&self, scheduler: &Scheduler, command: CommandRef) -> &Self {
        let (trigger, hold) = (self.clone(), self.clone());
        let bound = repeat_until(command, move || hold.state());
        scheduler.register_binding(Binding::run_command(move || trigger.falling_edge(), bound));
        self
    }

    /// Run `command` while the rising toggle is set
    pub fn toggle_true(&self, scheduler: &Scheduler, command: CommandRef) -> &Self {
        let (trigger, hold) = (self.clone(), self.clone());
        let bound: CommandRef =
            Rc::new(Lambda::from_command(command).add_finish(move || Ok(!hold.toggle_true_state())));
        scheduler.register_binding(Binding::run_command(move || trigger.toggle_true_state(), bound));
        self
    }

    /// Run `command` while the falling toggle is set
    pub fn toggle_false(&self, scheduler: &Scheduler, command: CommandRef) -> &Self {
        let (trigger, hold) = (self.clone(), self.clone());
        let bound: CommandRef =
            Rc::new(Lambda::from_command(command).add_finish(move || Ok(!hold.toggle_false_state())));
        scheduler.register_binding(Binding::run_command(move || trigger.toggle_false_state(), bound));
        self
    }
}

/// Wrap `command` so it restarts whenever it finishes, until `stop` holds
fn repeat_until<F>(command: CommandRef, stop: F) -> CommandRef
where
    F: Fn() -> bool + 'static,
{
    let inner = command.clone();
    Rc::new(Lambda::from_command(command).set_finish(move || {
        if stop() {
            return Ok(true);
        }
        if inner.finished()? {
            inner.end(false)?;
            inner.initialise()?;
        }
        Ok(false)
    }))
}

impl<T: TimeSource> fmt::Debug for BoundBoolean<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundBoolean")
            .field("state", &self.state.current.get())
            .field("previous", &self.state.previous.get())
            .field("rising", &self.state.rising)
            .field("falling", &self.state.falling)
            .finish()
    }
}
