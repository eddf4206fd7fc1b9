/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Timer scheduling.
//!
//! The session never sleeps. It asks a [`Scheduler`] for one-shot and
//! repeating timers and is told later, through `Session::handle_timer`, that a
//! timer identified by its [`TimerId`] has fired.
//!
//! Two schedulers are provided:
//! - [`TokioScheduler`]: real timers backed by tokio tasks, reporting fired
//!   ids over a channel
//! - [`ManualScheduler`]: a virtual clock advanced explicitly, for tests and
//!   simulations

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::warn;

/// Identifies a scheduled timer. Identifiers are never reused by a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl TimerId {
    /// Creates a timer identifier.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Schedules timers on behalf of a session.
pub trait Scheduler {
    /// Schedules a timer firing once after `delay`.
    fn schedule_once(&mut self, delay: Duration) -> TimerId;

    /// Schedules a timer firing every `period`, first after one period.
    fn schedule_repeating(&mut self, period: Duration) -> TimerId;

    /// Cancels a timer. Unknown or already fired ids are ignored.
    fn cancel(&mut self, id: TimerId);
}

/// Sending half of the fired-timer channel.
pub type TimerSender = mpsc::UnboundedSender<TimerId>;

/// Receiving half of the fired-timer channel.
pub type TimerReceiver = mpsc::UnboundedReceiver<TimerId>;

/// Scheduler backed by tokio timers.
///
/// Each timer runs as a task that sends its id on the channel when it fires.
/// A cancelled timer may still have one id in flight; the session ignores ids
/// it no longer tracks. Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct TokioScheduler {
    fired: TimerSender,
    next_id: u64,
    tasks: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioScheduler {
    /// Creates a scheduler reporting fired timers to `fired`.
    #[must_use]
    pub fn new(fired: TimerSender) -> Self {
        Self {
            fired,
            next_id: 0,
            tasks: HashMap::new(),
        }
    }

    /// Creates a scheduler together with its fired-timer channel.
    #[must_use]
    pub fn channel() -> (Self, TimerReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Returns the number of timers that have not finished.
    #[must_use]
    pub fn active(&self) -> usize {
        self.tasks.values().filter(|task| !task.is_finished()).count()
    }

    fn allocate(&mut self) -> TimerId {
        self.tasks.retain(|_, task| !task.is_finished());
        self.next_id += 1;
        TimerId(self.next_id)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_once(&mut self, delay: Duration) -> TimerId {
        let id = self.allocate();
        let fired = self.fired.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fired.send(id);
        });
        self.tasks.insert(id, task);
        id
    }

    fn schedule_repeating(&mut self, period: Duration) -> TimerId {
        let id = self.allocate();
        let fired = self.fired.clone();
        // a period too long to represent never fires
        let Some(start) = Instant::now()
            .checked_add(period)
            .filter(|start| start.checked_add(period).is_some())
        else {
            warn!(?period, %id, "repeating timer period out of range");
            return id;
        };
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if fired.send(id).is_err() {
                    break;
                }
            }
        });
        self.tasks.insert(id, task);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(task) = self.tasks.remove(&id) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ManualTimer {
    due: Duration,
    period: Option<Duration>,
}

#[derive(Debug, Default)]
struct ManualClock {
    now: Duration,
    next_id: u64,
    timers: BTreeMap<TimerId, ManualTimer>,
}

impl ManualClock {
    fn insert(&mut self, delay: Duration, period: Option<Duration>) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.timers.insert(
            id,
            ManualTimer {
                due: self.now.saturating_add(delay),
                period,
            },
        );
        id
    }

    /// Pops the earliest timer due at or before `deadline`, moving the clock
    /// to its due time. Ties fire in scheduling order.
    fn pop_due(&mut self, deadline: Duration) -> Option<TimerId> {
        let (id, timer) = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.due <= deadline)
            .min_by_key(|(id, timer)| (timer.due, **id))
            .map(|(id, timer)| (*id, *timer))?;

        self.now = self.now.max(timer.due);
        let next_due = timer
            .period
            .filter(|period| !period.is_zero())
            .and_then(|period| timer.due.checked_add(period));
        match (next_due, self.timers.get_mut(&id)) {
            (Some(due), Some(entry)) => entry.due = due,
            _ => {
                self.timers.remove(&id);
            }
        }
        Some(id)
    }
}

/// Scheduler driven by a virtual clock.
///
/// Cloning yields another handle to the same clock, so a test can keep one
/// handle while the session owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    clock: Arc<Mutex<ManualClock>>,
}

impl ManualScheduler {
    /// Creates a scheduler with the clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the virtual time elapsed since creation.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }

    /// Returns the number of scheduled timers.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.clock.lock().timers.len()
    }

    /// Returns true if `id` is still scheduled.
    #[must_use]
    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.clock.lock().timers.contains_key(&id)
    }

    /// Advances the clock by `by`, calling `on_fire` for each timer that comes
    /// due, in due order.
    ///
    /// The clock lock is released while `on_fire` runs, so the callback may
    /// schedule and cancel timers; timers it schedules fire within the same
    /// call if they come due before the new time.
    pub fn advance_with(&self, by: Duration, mut on_fire: impl FnMut(TimerId)) {
        let deadline = self.now().saturating_add(by);
        loop {
            let next = self.clock.lock().pop_due(deadline);
            match next {
                Some(id) => on_fire(id),
                None => break,
            }
        }
        let mut clock = self.clock.lock();
        clock.now = clock.now.max(deadline);
    }

    /// Advances the clock by `by` and returns the ids that fired.
    pub fn advance(&self, by: Duration) -> Vec<TimerId> {
        let mut fired = Vec::new();
        self.advance_with(by, |id| fired.push(id));
        fired
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&mut self, delay: Duration) -> TimerId {
        self.clock.lock().insert(delay, None)
    }

    fn schedule_repeating(&mut self, period: Duration) -> TimerId {
        self.clock.lock().insert(period, Some(period))
    }

    fn cancel(&mut self, id: TimerId) {
        self.clock.lock().timers.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_scheduler_once() {
        let mut scheduler = ManualScheduler::new();
        let id = scheduler.schedule_once(Duration::from_secs(2));
        assert!(scheduler.is_scheduled(id));

        assert!(scheduler.advance(Duration::from_secs(1)).is_empty());
        assert_eq!(scheduler.advance(Duration::from_secs(1)), vec![id]);
        assert!(!scheduler.is_scheduled(id));
        assert_eq!(scheduler.now(), Duration::from_secs(2));
    }

    #[test]
    fn test_manual_scheduler_repeating() {
        let mut scheduler = ManualScheduler::new();
        let id = scheduler.schedule_repeating(Duration::from_secs(5));

        assert_eq!(scheduler.advance(Duration::from_secs(15)), vec![id, id, id]);
        assert!(scheduler.is_scheduled(id));

        scheduler.cancel(id);
        assert!(scheduler.advance(Duration::from_secs(60)).is_empty());
        assert_eq!(scheduler.pending_timers(), 0);
    }

    #[test]
    fn test_manual_scheduler_ordering() {
        let mut scheduler = ManualScheduler::new();
        let slow = scheduler.schedule_once(Duration::from_secs(3));
        let fast = scheduler.schedule_once(Duration::from_secs(1));
        let tie = scheduler.schedule_once(Duration::from_secs(3));

        assert_eq!(
            scheduler.advance(Duration::from_secs(3)),
            vec![fast, slow, tie]
        );
    }

    #[test]
    fn test_manual_scheduler_reschedule_from_callback() {
        let scheduler = ManualScheduler::new();
        let mut handle = scheduler.clone();
        handle.schedule_once(Duration::from_secs(1));

        let mut fired = 0;
        scheduler.advance_with(Duration::from_secs(3), |_| {
            fired += 1;
            if fired < 3 {
                handle.schedule_once(Duration::from_secs(1));
            }
        });
        assert_eq!(fired, 3);
        assert_eq!(scheduler.now(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_fires_and_cancels() {
        let (mut scheduler, mut fired) = TokioScheduler::channel();
        let once = scheduler.schedule_once(Duration::from_millis(100));
        let cancelled = scheduler.schedule_once(Duration::from_millis(200));
        scheduler.cancel(cancelled);

        assert_eq!(fired.recv().await, Some(once));

        let repeating = scheduler.schedule_repeating(Duration::from_millis(50));
        assert_eq!(fired.recv().await, Some(repeating));
        assert_eq!(fired.recv().await, Some(repeating));
        scheduler.cancel(repeating);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(fired.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_out_of_range_period() {
        let (mut scheduler, mut fired) = TokioScheduler::channel();
        scheduler.schedule_repeating(Duration::from_secs(u64::MAX));
        assert_eq!(scheduler.active(), 0);

        let once = scheduler.schedule_once(Duration::from_millis(10));
        assert_eq!(fired.recv().await, Some(once));
    }

    #[test]
    fn test_manual_scheduler_saturates() {
        let mut scheduler = ManualScheduler::new();
        scheduler.schedule_once(Duration::from_secs(1));
        let huge = scheduler.schedule_repeating(Duration::MAX);
        assert_eq!(scheduler.advance(Duration::from_secs(2)).len(), 1);
        assert_eq!(scheduler.advance(Duration::MAX), vec![huge]);
        assert!(!scheduler.is_scheduled(huge));
    }
}
