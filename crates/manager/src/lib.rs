//! Play lifecycle management.
//!
//! Runs as a long-lived service that every cycle:
//! - Loads each active play from the record store (routing corrupt records
//!   to repair first)
//! - Refreshes the liveness heartbeat
//! - Builds a GTD context and resolves the configured exit policies
//! - Ratchets trailing stop/target levels
//! - Applies the resulting lifecycle transition and persists changes
//!
//! All rules are deterministic; broker execution and market data stay
//! behind the collaborator traits in `play-engine-core`.

pub mod exits;
pub mod liveness;
pub mod service;
pub mod trailing;
pub mod transitions;

pub use exits::check_exit_conditions;
pub use liveness::{Heartbeat, LivenessMonitor, LogOnlyRecovery, RecoveryHook};
pub use service::PlayMonitor;
pub use trailing::update_trailing_levels;
pub use transitions::{FillInfo, TransitionError};
