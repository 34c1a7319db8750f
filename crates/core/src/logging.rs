//! Logging abstraction
//!
//! Provides the `log_*!` macros used throughout the scheduler and the host
//! driver. They route to the [`log`] facade, so a firmware build installs
//! whatever backend it has (defmt bridge, USB serial, RTT) and host tests can
//! install `env_logger` or nothing at all.
//!
//! The macros are exported at the crate root:
//!
//! ```
//! pico_command_core::log_info!("scheduler ready ({} resources)", 3);
//! ```

#[doc(hidden)]
pub use log as __log;

/// Log info message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::__log::info!($($arg)*)
    };
}

/// Log warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::__log::warn!($($arg)*)
    };
}

/// Log error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::__log::error!($($arg)*)
    };
}

/// Log debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::__log::debug!($($arg)*)
    };
}

/// Log trace message
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        $crate::logging::__log::trace!($($arg)*)
    };
}
