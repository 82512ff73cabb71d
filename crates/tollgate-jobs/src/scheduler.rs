//! Periodic job scheduler.
//!
//! Each registered job gets its own tokio task that fires on wall-clock
//! aligned ticks (a job with a 3600s period runs on the hour). A job runs
//! at most once at a time: the loop awaits the run before arming the next
//! tick. When a run overshoots past one or more ticks, the missed ticks
//! coalesce into a single catch-up run, and a tick that is already older
//! than the job's grace window is skipped with a warning instead.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// A job body: called once per tick, awaited to completion.
pub type JobFn = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// One periodic job registration.
#[derive(Clone)]
pub struct JobSpec {
    pub id: &'static str,
    pub period_secs: u64,
    pub grace_secs: u64,
    pub task: JobFn,
}

impl JobSpec {
    pub fn new<F, Fut>(id: &'static str, period_secs: u64, grace_secs: u64, task: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            id,
            period_secs,
            grace_secs,
            task: Arc::new(move || Box::pin(task())),
        }
    }
}

/// Spawns and owns the per-job loops. Dropping the scheduler without
/// calling [`Scheduler::shutdown`] aborts nothing; the loops stop when the
/// shutdown sender goes away.
pub struct Scheduler {
    shutdown_tx: broadcast::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shutdown_tx,
            handles: Vec::new(),
        }
    }

    /// Spawn the loop for one job.
    pub fn spawn(&mut self, spec: JobSpec) {
        let shutdown_rx = self.shutdown_tx.subscribe();
        tracing::info!(
            job = spec.id,
            period_secs = spec.period_secs,
            "job registered"
        );
        self.handles.push(tokio::spawn(run_loop(spec, shutdown_rx)));
    }

    /// Stop all job loops and wait for in-flight runs to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        for handle in self.handles {
            let _ = handle.await;
        }
        tracing::info!("scheduler stopped");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_loop(spec: JobSpec, mut shutdown_rx: broadcast::Receiver<()>) {
    let mut next_tick = next_aligned_tick(unix_now(), spec.period_secs);
    loop {
        let now = unix_now();
        if now < next_tick {
            let wait = Duration::from_secs(next_tick - now);
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown_rx.recv() => {
                    tracing::info!(job = spec.id, "job loop stopped");
                    return;
                }
            }
        }

        let late = unix_now().saturating_sub(next_tick);
        if late > spec.grace_secs {
            tracing::warn!(
                job = spec.id,
                late_secs = late,
                "tick missed beyond grace window, skipping run"
            );
        } else {
            (spec.task)().await;
        }

        next_tick = next_tick_after(next_tick, unix_now(), spec.period_secs);
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// The first tick boundary strictly after `now`.
fn next_aligned_tick(now: u64, period_secs: u64) -> u64 {
    let period = period_secs.max(1);
    now - now % period + period
}

/// Advance past the tick at `current`. When the run overshot one or more
/// later ticks, they coalesce: the job next fires at the first boundary
/// after `now`.
fn next_tick_after(current: u64, now: u64, period_secs: u64) -> u64 {
    let period = period_secs.max(1);
    if now >= current + period {
        next_aligned_tick(now, period)
    } else {
        current + period
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_ticks_align_to_wall_clock() {
        assert_eq!(next_aligned_tick(3_599, 3_600), 3_600);
        assert_eq!(next_aligned_tick(3_600, 3_600), 7_200);
        assert_eq!(next_aligned_tick(3_601, 3_600), 7_200);
    }

    #[test]
    fn test_on_time_run_advances_one_period() {
        // Finished well inside the period that began at 7200.
        assert_eq!(next_tick_after(7_200, 7_230, 3_600), 10_800);
    }

    #[test]
    fn test_overrun_coalesces_missed_ticks() {
        // Run armed at 7200 finished at 18050, missing the 10800 and 14400
        // ticks. One catch-up boundary, not three.
        assert_eq!(next_tick_after(7_200, 18_050, 3_600), 21_600);
    }

    #[tokio::test]
    async fn test_shutdown_stops_idle_loops() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);

        let mut scheduler = Scheduler::new();
        scheduler.spawn(JobSpec::new("idle", 86_400, 3_600, move || {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        }));

        // The first tick is up to a day away; shutdown must not wait for it.
        scheduler.shutdown().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
