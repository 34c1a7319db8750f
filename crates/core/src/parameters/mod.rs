//! Parameter management types and utilities
//!
//! A fixed-capacity name/value store plus the parameter blocks read by the
//! scheduler and the input binding layer. Blocks register their defaults
//! once and are materialised with `from_store` whenever the host
//! (re)configures a session.

pub mod binding;
pub mod error;
pub mod scheduler;
pub mod storage;

pub use binding::BindingParams;
pub use error::ParameterError;
pub use scheduler::SchedulerParams;
pub use storage::{ParamFlags, ParamMetadata, ParamValue, ParameterStore};
pub use storage::{MAX_PARAMS, MAX_STRING_LEN, PARAM_NAME_LEN};
