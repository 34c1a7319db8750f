//! Time abstraction traits for platform-agnostic timing operations.
//!
//! This module provides the `TimeSource` trait consumed by time-based
//! commands (`Wait`) and debounced inputs, so both can be driven by a
//! controllable clock in host tests.

use alloc::rc::Rc;
use core::cell::Cell;
use core::time::Duration;

/// Platform-agnostic time source for commands and input debouncing.
///
/// This trait abstracts over different time providers:
/// - `StdTime` for hosts with a monotonic clock (`std` feature)
/// - `MockTime` for host testing with controllable time
///
/// # Example
///
/// ```
/// use pico_command_core::traits::{MockTime, TimeSource};
///
/// fn expired<T: TimeSource>(time: &T, start_us: u64, timeout_us: u64) -> bool {
///     time.elapsed_since(start_us) >= timeout_us
/// }
///
/// let time = MockTime::new();
/// let start = time.now_us();
/// time.advance(20_000);
/// assert!(expired(&time, start, 20_000));
/// ```
pub trait TimeSource: Clone {
    /// Returns current time in milliseconds since the source's epoch.
    fn now_ms(&self) -> u64;

    /// Returns current time in microseconds since the source's epoch.
    fn now_us(&self) -> u64;

    /// Returns elapsed time in microseconds since a reference point.
    ///
    /// Uses saturating subtraction to handle potential overflow.
    fn elapsed_since(&self, reference_us: u64) -> u64 {
        self.now_us().saturating_sub(reference_us)
    }

    /// Returns `true` once at least `duration` has passed since `reference_us`.
    fn has_elapsed(&self, reference_us: u64, duration: Duration) -> bool {
        u128::from(self.elapsed_since(reference_us)) >= duration.as_micros()
    }
}

// ============================================================================
// Mock Implementation (always available for testing)
// ============================================================================

/// Mock time source for testing with controllable time advancement.
///
/// Clones share the same clock, so a test can keep one handle and hand
/// another to the commands under test.
///
/// # Example
///
/// ```
/// use pico_command_core::traits::{MockTime, TimeSource};
///
/// let time = MockTime::new();
/// let command_clock = time.clone();
///
/// time.advance(1000); // Advance 1ms
/// assert_eq!(command_clock.now_us(), 1000);
/// assert_eq!(command_clock.now_ms(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockTime {
    current_us: Rc<Cell<u64>>,
}

impl MockTime {
    /// Creates a new `MockTime` starting at time 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `MockTime` starting at the specified time.
    pub fn with_initial(us: u64) -> Self {
        Self {
            current_us: Rc::new(Cell::new(us)),
        }
    }

    /// Sets the current time to an absolute value.
    pub fn set(&self, us: u64) {
        self.current_us.set(us);
    }

    /// Advances the current time by the specified amount.
    pub fn advance(&self, us: u64) {
        self.current_us.set(self.current_us.get() + us);
    }

    /// Advances the current time by a [`Duration`].
    pub fn advance_by(&self, duration: Duration) {
        self.advance(duration.as_micros() as u64);
    }
}

impl TimeSource for MockTime {
    fn now_ms(&self) -> u64 {
        self.current_us.get() / 1000
    }

    fn now_us(&self) -> u64 {
        self.current_us.get()
    }
}

// ============================================================================
// Wall-clock Implementation
// ============================================================================

/// Monotonic wall-clock time source measured from its creation.
#[cfg(feature = "std")]
#[derive(Clone, Copy, Debug)]
pub struct StdTime {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdTime {
    /// Creates a time source whose epoch is now.
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdTime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for StdTime {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
