//! The production scheduler, backed by tokio timers.

use crate::scheduler::{Cancelable, Scheduler, TimerAction, Timestamp};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// A [`Scheduler`] over the tokio clock.
///
/// Logical time is measured from the instant the scheduler was created.
/// Periodic timers run on a spawned task guarded by a
/// [`CancellationToken`], so [`schedule_periodic`](Scheduler::schedule_periodic)
/// must be called from within a tokio runtime. Because it reads
/// `tokio::time`, the scheduler follows a paused test clock
/// (`#[tokio::test(start_paused = true)]`).
#[derive(Debug, Clone)]
pub struct TokioScheduler {
  epoch: Instant,
}

impl Default for TokioScheduler {
  fn default() -> Self {
    Self::new()
  }
}

impl TokioScheduler {
  /// Creates a scheduler whose epoch is the current instant.
  pub fn new() -> Self {
    Self {
      epoch: Instant::now(),
    }
  }
}

impl Scheduler for TokioScheduler {
  fn now(&self) -> Timestamp {
    Timestamp::ZERO + Instant::now().duration_since(self.epoch)
  }

  fn schedule_periodic(
    &self,
    initial_delay: Duration,
    period: Duration,
    mut action: TimerAction,
  ) -> Cancelable {
    let token = CancellationToken::new();
    let guard = token.clone();
    let epoch = self.epoch;
    let first = Instant::now() + initial_delay;
    tokio::spawn(async move {
      let mut ticks = tokio::time::interval_at(first, period);
      // Ticks missed under load collapse into a single firing.
      ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
      loop {
        tokio::select! {
          _ = guard.cancelled() => return,
          at = ticks.tick() => action(Timestamp::ZERO + at.duration_since(epoch)),
        }
      }
    });
    Cancelable::new(move || token.cancel())
  }
}
