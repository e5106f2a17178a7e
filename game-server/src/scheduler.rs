//! Phase clocks. Production timers run on tokio; tests drive a virtual clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Cancellable reference to a scheduled callback.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    abort: Option<AbortHandle>,
}

impl TimerHandle {
    fn new(cancelled: Arc<AtomicBool>, abort: Option<AbortHandle>) -> Self {
        Self { cancelled, abort }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

pub trait PhaseScheduler: Send + Sync {
    /// Milliseconds since the Unix epoch, as the server sees it.
    fn now_ms(&self) -> i64;

    /// Run `callback` once after `delay_ms`. Negative delays run as soon as possible.
    fn schedule(&self, delay_ms: i64, callback: TimerCallback) -> TimerHandle;
}

/// Wall clock plus `tokio::time::sleep` tasks.
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }
}

impl PhaseScheduler for TokioScheduler {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn schedule(&self, delay_ms: i64, callback: TimerCallback) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let delay = Duration::from_millis(delay_ms.max(0) as u64);

        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if !flag.load(Ordering::SeqCst) {
                callback();
            }
        });

        TimerHandle::new(cancelled, Some(task.abort_handle()))
    }
}

struct ScheduledTask {
    due_ms: i64,
    seq: u64,
    cancelled: Arc<AtomicBool>,
    callback: TimerCallback,
}

/// Virtual clock for tests. Nothing runs until [`ManualScheduler::advance`].
pub struct ManualScheduler {
    now: AtomicI64,
    next_seq: AtomicU64,
    tasks: Mutex<Vec<ScheduledTask>>,
}

impl ManualScheduler {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
            next_seq: AtomicU64::new(0),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Move the clock forward, running every due callback in deadline order.
    /// Callbacks may schedule more work; anything due before the target runs
    /// in the same call. Returns the number of callbacks run.
    pub fn advance(&self, delta_ms: i64) -> usize {
        let target = self.now_ms() + delta_ms.max(0);
        let mut ran = 0;

        loop {
            let next = {
                let mut tasks = self.tasks.lock();
                let due = tasks
                    .iter()
                    .enumerate()
                    .filter(|(_, task)| task.due_ms <= target)
                    .min_by_key(|(_, task)| (task.due_ms, task.seq))
                    .map(|(index, _)| index);
                due.map(|index| tasks.swap_remove(index))
            };
            let Some(task) = next else {
                break;
            };

            // the callback must not run under the task lock: it may schedule
            self.now.fetch_max(task.due_ms, Ordering::SeqCst);
            if !task.cancelled.load(Ordering::SeqCst) {
                (task.callback)();
                ran += 1;
            }
        }

        self.now.store(target, Ordering::SeqCst);
        ran
    }

    /// Scheduled callbacks that have not run or been cancelled.
    pub fn pending(&self) -> usize {
        self.tasks
            .lock()
            .iter()
            .filter(|task| !task.cancelled.load(Ordering::SeqCst))
            .count()
    }
}

impl PhaseScheduler for ManualScheduler {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }

    fn schedule(&self, delay_ms: i64, callback: TimerCallback) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let task = ScheduledTask {
            due_ms: self.now_ms() + delay_ms.max(0),
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            cancelled: cancelled.clone(),
            callback,
        };
        self.tasks.lock().push(task);
        TimerHandle::new(cancelled, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> TimerCallback) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |name: &'static str| -> TimerCallback {
            let sink = sink.clone();
            Box::new(move || sink.lock().push(name))
        };
        (log, make)
    }

    #[test]
    fn test_manual_scheduler_runs_in_deadline_order() {
        let scheduler = ManualScheduler::new(1_000);
        let (log, make) = recorder();

        scheduler.schedule(300, make("late"));
        scheduler.schedule(100, make("early"));
        scheduler.schedule(100, make("early-second"));

        assert_eq!(scheduler.advance(99), 0);
        assert_eq!(scheduler.now_ms(), 1_099);

        assert_eq!(scheduler.advance(201), 3);
        assert_eq!(*log.lock(), vec!["early", "early-second", "late"]);
        assert_eq!(scheduler.now_ms(), 1_300);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_cancelled_timer_never_runs() {
        let scheduler = ManualScheduler::new(0);
        let (log, make) = recorder();

        let handle = scheduler.schedule(10, make("cancelled"));
        scheduler.schedule(20, make("kept"));
        handle.cancel();

        assert!(handle.is_cancelled());
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.advance(50), 1);
        assert_eq!(*log.lock(), vec!["kept"]);
    }

    #[test]
    fn test_callbacks_can_schedule_follow_ups() {
        let scheduler = Arc::new(ManualScheduler::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner_scheduler = scheduler.clone();
        let inner_seen = seen.clone();
        scheduler.schedule(
            10,
            Box::new(move || {
                inner_seen.lock().push(inner_scheduler.now_ms());
                let seen = inner_seen.clone();
                let clock = inner_scheduler.clone();
                inner_scheduler.schedule(
                    15,
                    Box::new(move || seen.lock().push(clock.now_ms())),
                );
            }),
        );

        assert_eq!(scheduler.advance(100), 2);
        assert_eq!(*seen.lock(), vec![10, 25]);
    }

    #[tokio::test]
    async fn test_tokio_scheduler_fires_and_cancels() {
        let scheduler = TokioScheduler::new(Handle::current());
        let fired = Arc::new(AtomicBool::new(false));
        let cancelled_fired = Arc::new(AtomicBool::new(false));

        let flag = fired.clone();
        scheduler.schedule(5, Box::new(move || flag.store(true, Ordering::SeqCst)));
        let flag = cancelled_fired.clone();
        let handle = scheduler.schedule(5, Box::new(move || flag.store(true, Ordering::SeqCst)));
        handle.cancel();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(!cancelled_fired.load(Ordering::SeqCst));
    }
}
