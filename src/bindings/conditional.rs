//! Threshold conditions over numeric inputs

use super::{BoundBoolean, InputRegistry};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;
use pico_command_core::traits::TimeSource;

/// One bound of a range
#[derive(Debug, Clone, Copy, PartialEq)]
enum Bound {
    Unbounded,
    Exclusive(f64),
    Inclusive(f64),
}

/// Interval the value may fall into
#[derive(Debug, Clone, Copy, PartialEq)]
struct Range {
    lower: Bound,
    upper: Bound,
}

impl Range {
    fn contains(&self, value: f64) -> bool {
        let above = match self.lower {
            Bound::Unbounded => true,
            Bound::Exclusive(lower) => value > lower,
            Bound::Inclusive(lower) => value >= lower,
        };
        let below = match self.upper {
            Bound::Unbounded => true,
            Bound::Exclusive(upper) => value < upper,
            Bound::Inclusive(upper) => value <= upper,
        };
        above && below
    }

    fn lower_value(&self) -> Option<f64> {
        match self.lower {
            Bound::Exclusive(v) | Bound::Inclusive(v) => Some(v),
            Bound::Unbounded => None,
        }
    }
}

/// Chained threshold condition over a numeric source
///
/// Thresholds build a union of ranges. A lower threshold
/// (`greater_than*`) opens a new range; an upper threshold (`less_than*`)
/// closes the most recent open range when it lies above that range's lower
/// bound, and otherwise starts a range of its own. So
/// `greater_than(0.0).less_than(5.0)` is `0 < x < 5`, while
/// `less_than(0.0).greater_than(5.0)` is `x < 0 || x > 5`.
///
/// Every builder returns a new condition; [`BoundConditional::bind`]
/// turns the condition into a registered [`BoundBoolean`].
pub struct BoundConditional<T: TimeSource> {
    registry: InputRegistry<T>,
    source: Rc<dyn Fn() -> f64>,
    ranges: Vec<Range>,
    /// Index of the range still waiting for an upper bound
    open: Option<usize>,
}

impl<T: TimeSource + 'static> BoundConditional<T> {
    pub(super) fn new<F>(registry: &InputRegistry<T>, source: F) -> Self
    where
        F: Fn() -> f64 + 'static,
    {
        Self {
            registry: registry.clone(),
            source: Rc::new(source),
            ranges: Vec::new(),
            open: None,
        }
    }

    fn with_lower(&self, lower: Bound) -> Self {
        let mut next = self.clone();
        next.ranges.push(Range {
            lower,
            upper: Bound::Unbounded,
        });
        next.open = Some(next.ranges.len() - 1);
        next
    }

    fn with_upper(&self, upper: Bound, value: f64) -> Self {
        let mut next = self.clone();
        let closable = next
            .open
            .filter(|&index| next.ranges[index].lower_value().is_some_and(|lower| lower < value));
        match closable {
            Some(index) => next.ranges[index].upper = upper,
            None => next.ranges.push(Range {
                lower: Bound::Unbounded,
                upper,
            }),
        }
        next.open = None;
        next
    }

    /// `x < value`
    pub fn less_than(&self, value: f64) -> Self {
        self.with_upper(Bound::Exclusive(value), value)
    }

    /// `x <= value`
    pub fn less_than_equal(&self, value: f64) -> Self {
        self.with_upper(Bound::Inclusive(value), value)
    }

    /// `x > value`
    pub fn greater_than(&self, value: f64) -> Self {
        self.with_lower(Bound::Exclusive(value))
    }

    /// `x >= value`
    pub fn greater_than_equal(&self, value: f64) -> Self {
        self.with_lower(Bound::Inclusive(value))
    }

    /// `|x - value| <= tolerance`
    pub fn equal_to(&self, value: f64, tolerance: f64) -> Self {
        let tolerance = tolerance.abs();
        let mut next = self.clone();
        next.ranges.push(Range {
            lower: Bound::Inclusive(value - tolerance),
            upper: Bound::Inclusive(value + tolerance),
        });
        next.open = None;
        next
    }

    /// Evaluate the condition against a value
    pub fn test(&self, value: f64) -> bool {
        self.ranges.iter().any(|range| range.contains(value))
    }

    /// Sample the source and evaluate the condition
    pub fn evaluate(&self) -> bool {
        self.test((self.source)())
    }

    /// Register the condition as a boolean input
    pub fn bind(&self) -> BoundBoolean<T> {
        let condition = self.clone();
        self.registry.boolean(move || condition.evaluate())
    }
}

impl<T: TimeSource> Clone for BoundConditional<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            source: self.source.clone(),
            ranges: self.ranges.clone(),
            open: self.open,
        }
    }
}

impl<T: TimeSource> fmt::Debug for BoundConditional<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundConditional")
            .field("ranges", &self.ranges)
            .finish()
    }
}
