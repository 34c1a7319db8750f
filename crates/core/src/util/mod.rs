//! Utility commands
//!
//! - [`IfElse`]: branch chosen once per run
//! - [`SelectionCommand`]: keyed branch re-selected on every schedule
//! - [`StateMachine`]: keyed states switched through a shared state cell
//! - [`Wait`]: time-based leaf

pub mod if_else;
pub mod selection;
pub mod state_machine;
pub mod wait;

pub use if_else::IfElse;
pub use selection::SelectionCommand;
pub use state_machine::{StateCell, StateMachine};
pub use wait::Wait;
