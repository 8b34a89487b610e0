//! Background scheduler for periodic jobs
//!
//! A ticker thread wakes up in short steps, and once a full interval has
//! passed since the last start it hands the job to a worker thread. At most
//! one run is in flight: a tick that finds the previous run still going is
//! skipped, not queued.

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::timing::interval_elapsed;

/// Longest the ticker sleeps before re-checking the stop flag
const POLL_STEP: Duration = Duration::from_millis(250);

type Job = dyn Fn() -> Result<()> + Send + Sync + 'static;

/// Handle to a running periodic job
///
/// Dropping the handle stops the ticker.
pub struct Scheduler {
    name: String,
    stop: Arc<AtomicBool>,
    ticker: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Start running `job` every `interval`
    ///
    /// The first run happens one interval after start.
    pub fn start<F>(name: impl Into<String>, interval: Duration, job: F) -> Result<Self>
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        let name = name.into();
        let chrono_interval = chrono::Duration::from_std(interval)?;
        let stop = Arc::new(AtomicBool::new(false));
        let job: Arc<Job> = Arc::new(job);

        let ticker = {
            let name = name.clone();
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name(format!("{}-ticker", name))
                .spawn(move || tick_loop(&name, chrono_interval, &stop, job))?
        };

        info!("[scheduler] started '{}' every {:?}", name, interval);
        Ok(Self {
            name,
            stop,
            ticker: Some(ticker),
        })
    }

    /// Stop scheduling new runs
    ///
    /// Returns once the ticker has exited. A run already in progress keeps
    /// going on its own thread.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(ticker) = self.ticker.take() {
            if ticker.join().is_err() {
                error!("[scheduler] ticker for '{}' panicked", self.name);
            }
            info!("[scheduler] stopped '{}'", self.name);
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Clears the in-flight flag when a run ends, even by panic
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn tick_loop(name: &str, interval: chrono::Duration, stop: &AtomicBool, job: Arc<Job>) {
    let busy = Arc::new(AtomicBool::new(false));
    let mut last_run_at: Option<DateTime<Utc>> = Some(Utc::now());
    let step = interval
        .to_std()
        .map(|i| i.min(POLL_STEP))
        .unwrap_or(POLL_STEP)
        .max(Duration::from_millis(1));

    while !stop.load(Ordering::SeqCst) {
        thread::sleep(step);
        if stop.load(Ordering::SeqCst) || !interval_elapsed(last_run_at, interval) {
            continue;
        }
        last_run_at = Some(Utc::now());

        if busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("[scheduler] '{}' still running, skipping tick", name);
            continue;
        }

        let guard = InFlight(Arc::clone(&busy));
        let job = Arc::clone(&job);
        let job_name = name.to_string();
        let spawned = thread::Builder::new()
            .name(format!("{}-run", name))
            .spawn(move || {
                let _guard = guard;
                // Jobs log their own failures
                if let Err(e) = job() {
                    debug!("[scheduler] '{}' returned error: {:#}", job_name, e);
                }
            });
        if let Err(e) = spawned {
            // The closure (and its guard) is dropped, so the flag is already clear
            error!("[scheduler] failed to spawn '{}': {}", name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_job_runs_periodically() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = {
            let runs = Arc::clone(&runs);
            Scheduler::start("test", Duration::from_millis(20), move || {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap()
        };

        thread::sleep(Duration::from_millis(300));
        scheduler.shutdown();
        assert!(runs.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_first_run_waits_one_interval() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = {
            let runs = Arc::clone(&runs);
            Scheduler::start("slow", Duration::from_secs(3600), move || {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap()
        };

        thread::sleep(Duration::from_millis(100));
        scheduler.shutdown();
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_overlapping_runs_are_skipped() {
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let mut scheduler = {
            let active = Arc::clone(&active);
            let max_active = Arc::clone(&max_active);
            Scheduler::start("overlap", Duration::from_millis(5), move || {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(40));
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap()
        };

        thread::sleep(Duration::from_millis(300));
        scheduler.shutdown();
        assert_eq!(max_active.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_job_keeps_scheduling() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = {
            let runs = Arc::clone(&runs);
            Scheduler::start("failing", Duration::from_millis(10), move || {
                runs.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("boom")
            })
            .unwrap()
        };

        thread::sleep(Duration::from_millis(300));
        scheduler.shutdown();
        assert!(runs.load(Ordering::SeqCst) >= 2);
    }
}
