//! Periodic background work
//!
//! The hourly keyword check and the scheduler that drives it.

mod hourly;
mod scheduler;
mod timing;

pub use hourly::{HOURLY_CHECK_MAX_RESULTS, hourly_check, run_hourly_check};
pub use scheduler::Scheduler;
pub use timing::{interval_elapsed, interval_elapsed_at};
