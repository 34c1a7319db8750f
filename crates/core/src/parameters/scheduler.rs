//! Scheduler Parameter Definitions
//!
//! # Parameters
//!
//! - `SCHED_DEF_CMD` - Inject default commands for idle resources (bool, default on)

use super::error::ParameterError;
use super::storage::{ParamFlags, ParamValue, ParameterStore};

/// Scheduler parameters loaded from parameter store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerParams {
    /// Schedule registered default commands for idle, unclaimed resources
    pub default_commands: bool,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            default_commands: true,
        }
    }
}

impl SchedulerParams {
    /// Register scheduler parameters with default values
    pub fn register_defaults(store: &mut ParameterStore) -> Result<(), ParameterError> {
        store.register("SCHED_DEF_CMD", ParamValue::Bool(true), ParamFlags::empty())?;
        Ok(())
    }

    /// Load scheduler parameters from parameter store
    ///
    /// Missing or mistyped entries fall back to the defaults.
    pub fn from_store(store: &ParameterStore) -> Self {
        let default_commands = match store.get("SCHED_DEF_CMD") {
            Some(ParamValue::Bool(v)) => *v,
            Some(ParamValue::Int(v)) => *v != 0,
            Some(ParamValue::Float(v)) => *v != 0.0,
            _ => true,
        };

        Self { default_commands }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_defaults() {
        let mut store = ParameterStore::new();
        SchedulerParams::register_defaults(&mut store).unwrap();

        assert_eq!(store.get("SCHED_DEF_CMD"), Some(&ParamValue::Bool(true)));
    }

    #[test]
    fn test_from_store_defaults() {
        let store = ParameterStore::new();
        assert_eq!(
            SchedulerParams::from_store(&store),
            SchedulerParams::default()
        );
    }

    #[test]
    fn test_from_store_custom_values() {
        let mut store = ParameterStore::new();
        SchedulerParams::register_defaults(&mut store).unwrap();
        store.set("SCHED_DEF_CMD", ParamValue::Bool(false)).unwrap();

        let params = SchedulerParams::from_store(&store);
        assert!(!params.default_commands);
    }
}
