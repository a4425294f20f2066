//! Bundled exit-timing policies.
//!
//! Each policy is a pure function of the cycle context: no clocks, no I/O,
//! no side effects beyond the returned result and state. New policies are
//! added to the compile-time table in [`crate::registry`].

pub mod dte_close;
pub mod event_calendar;
pub mod half_life;
pub mod loss_shorten;
pub mod max_hold;
pub mod profit_extend;
pub mod profit_time_stop;
pub mod rolling_extension;
pub mod theta_decay;
pub mod weekend_theta;
