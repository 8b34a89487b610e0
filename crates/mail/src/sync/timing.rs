//! Interval timing for periodic jobs
//!
//! Pure functions that can be tested without spawning threads.

use chrono::{DateTime, Duration, Utc};

/// Check if a full interval has passed since the last run.
///
/// # Arguments
/// * `last_run_at` - When the job was last started (None if never started)
/// * `interval` - Minimum time between two starts
///
/// # Returns
/// `true` if the job is due, `false` if it ran less than `interval` ago
pub fn interval_elapsed(last_run_at: Option<DateTime<Utc>>, interval: Duration) -> bool {
    interval_elapsed_at(last_run_at, interval, Utc::now())
}

/// Same as [`interval_elapsed`] against an explicit clock reading
pub fn interval_elapsed_at(
    last_run_at: Option<DateTime<Utc>>,
    interval: Duration,
    now: DateTime<Utc>,
) -> bool {
    match last_run_at {
        Some(last) => now - last >= interval,
        None => true,
    }
}
