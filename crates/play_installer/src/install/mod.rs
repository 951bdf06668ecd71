//! Install automation for a single device
//!
//! This module provides:
//! - `state`: Install states and their transition table
//! - `machine`: The state machine that drives the Play Store page

mod machine;
mod state;

pub use machine::InstallStateMachine;
pub use state::InstallState;
