//! Input Binding Parameter Definitions
//!
//! Default debounce windows for bound boolean inputs. A window of zero
//! reports every change on the poll where it is observed.
//!
//! # Parameters
//!
//! - `BIND_DEB_RISE` - Debounce window for false -> true changes (ms, default 0)
//! - `BIND_DEB_FALL` - Debounce window for true -> false changes (ms, default 0)

use super::error::ParameterError;
use super::storage::{ParamFlags, ParamValue, ParameterStore};
use core::time::Duration;

/// Binding parameters loaded from parameter store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindingParams {
    /// Debounce window for rising changes (milliseconds)
    pub rising_debounce_ms: u32,
    /// Debounce window for falling changes (milliseconds)
    pub falling_debounce_ms: u32,
}

impl BindingParams {
    /// Register binding parameters with default values
    pub fn register_defaults(store: &mut ParameterStore) -> Result<(), ParameterError> {
        store.register("BIND_DEB_RISE", ParamValue::Int(0), ParamFlags::empty())?;
        store.register("BIND_DEB_FALL", ParamValue::Int(0), ParamFlags::empty())?;
        Ok(())
    }

    /// Load binding parameters from parameter store
    ///
    /// Negative values clamp to zero.
    pub fn from_store(store: &ParameterStore) -> Self {
        Self {
            rising_debounce_ms: Self::read_ms(store, "BIND_DEB_RISE"),
            falling_debounce_ms: Self::read_ms(store, "BIND_DEB_FALL"),
        }
    }

    fn read_ms(store: &ParameterStore, name: &str) -> u32 {
        match store.get(name) {
            Some(ParamValue::Int(v)) => (*v).max(0) as u32,
            Some(ParamValue::Float(v)) if *v > 0.0 => *v as u32,
            _ => 0,
        }
    }

    /// Rising debounce window
    pub fn rising_debounce(&self) -> Duration {
        Duration::from_millis(u64::from(self.rising_debounce_ms))
    }

    /// Falling debounce window
    pub fn falling_debounce(&self) -> Duration {
        Duration::from_millis(u64::from(self.falling_debounce_ms))
    }
}
