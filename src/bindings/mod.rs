//! Input bindings
//!
//! Bound inputs wrap raw sensor or controller reads and turn them into
//! debounced boolean signals the scheduler can react to. Every input is
//! created through an [`InputRegistry`], which the host refreshes after each
//! lifecycle hook so that all inputs sample once per loop iteration and
//! every binding polled during the next iteration sees the same snapshot.
//!
//! # Components
//!
//! - [`InputRegistry`]: Creates inputs and refreshes them once per hook
//! - [`BoundBoolean`]: Debounced edges, toggles and command binders
//! - [`BoundConditional`]: Threshold ranges over a numeric source

mod boolean;
mod conditional;

pub use boolean::BoundBoolean;
pub use conditional::BoundConditional;

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::time::Duration;
use pico_command_core::parameters::BindingParams;
use pico_command_core::traits::TimeSource;

/// Anything the registry re-samples after a hook
trait Refresh {
    fn invalidate(&self);
    fn sample(&self);
}

struct RegistryInner<T: TimeSource> {
    time: T,
    params: Cell<BindingParams>,
    inputs: RefCell<Vec<Rc<dyn Refresh>>>,
}

/// Shared registry of bound inputs
///
/// Cloning the handle shares the same registry.
pub struct InputRegistry<T: TimeSource> {
    inner: Rc<RegistryInner<T>>,
}

impl<T: TimeSource> Clone for InputRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: TimeSource + 'static> InputRegistry<T> {
    /// Create a registry with zero default debounce
    pub fn new(time: T) -> Self {
        Self::with_params(time, BindingParams::default())
    }

    /// Create a registry with explicit default debounce windows
    pub fn with_params(time: T, params: BindingParams) -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                time,
                params: Cell::new(params),
                inputs: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Default debounce windows for new inputs
    pub fn params(&self) -> BindingParams {
        self.inner.params.get()
    }

    /// Replace the default debounce windows; existing inputs keep theirs
    pub fn set_params(&self, params: BindingParams) {
        self.inner.params.set(params);
    }

    /// Time source shared by every input
    pub fn time(&self) -> &T {
        &self.inner.time
    }

    /// Bind a boolean source using the default debounce windows
    pub fn boolean<F>(&self, source: F) -> BoundBoolean<T>
    where
        F: Fn() -> bool + 'static,
    {
        let params = self.params();
        self.boolean_with_debounce(source, params.rising_debounce(), params.falling_debounce())
    }

    /// Bind a boolean source with explicit debounce windows
    pub fn boolean_with_debounce<F>(&self, source: F, rising: Duration, falling: Duration) -> BoundBoolean<T>
    where
        F: Fn() -> bool + 'static,
    {
        BoundBoolean::create(self, Rc::new(source), rising, falling)
    }

    /// Bind a numeric source for threshold conditions
    pub fn conditional<F>(&self, source: F) -> BoundConditional<T>
    where
        F: Fn() -> f64 + 'static,
    {
        BoundConditional::new(self, source)
    }

    /// Invalidate every input, then sample them in creation order
    pub fn refresh(&self) {
        let inputs = self.inner.inputs.borrow().clone();
        for input in &inputs {
            input.invalidate();
        }
        for input in &inputs {
            input.sample();
        }
    }

    /// Forget every input
    ///
    /// Inputs already handed out keep working but are no longer refreshed.
    pub fn clear(&self) {
        let inputs = core::mem::take(&mut *self.inner.inputs.borrow_mut());
        drop(inputs);
    }

    /// Number of registered inputs
    pub fn len(&self) -> usize {
        self.inner.inputs.borrow().len()
    }

    /// `true` if no inputs are registered
    pub fn is_empty(&self) -> bool {
        self.inner.inputs.borrow().is_empty()
    }

    fn register(&self, input: Rc<dyn Refresh>) {
        self.inner.inputs.borrow_mut().push(input);
    }

    fn downgrade(&self) -> WeakRegistry<T> {
        WeakRegistry {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl<T: TimeSource> fmt::Debug for InputRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputRegistry")
            .field("inputs", &self.inner.inputs.borrow().len())
            .field("params", &self.inner.params.get())
            .finish()
    }
}

/// Registry handle held by inputs so derived inputs register themselves
struct WeakRegistry<T: TimeSource> {
    inner: Weak<RegistryInner<T>>,
}

impl<T: TimeSource> Clone for WeakRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: TimeSource> WeakRegistry<T> {
    fn upgrade(&self) -> Option<InputRegistry<T>> {
        self.inner.upgrade().map(|inner| InputRegistry { inner })
    }
}
