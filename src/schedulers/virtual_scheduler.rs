//! A deterministic scheduler whose clock moves only when told to.

use crate::scheduler::{Cancelable, Scheduler, TimerAction, Timestamp};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct PeriodicEntry {
  /// Schedule order, used to break ties between timers due at the same
  /// instant.
  id: u64,
  due: Timestamp,
  period: Duration,
  action: TimerAction,
  cancelled: Arc<AtomicBool>,
}

struct VirtualCore {
  now: Timestamp,
  next_id: u64,
  timers: Vec<PeriodicEntry>,
}

/// A manual-advance clock with exact, reproducible timer firings.
///
/// The clock starts at [`Timestamp::ZERO`] and moves only through
/// [`advance`](VirtualScheduler::advance) /
/// [`advance_to`](VirtualScheduler::advance_to), which run every periodic
/// action that falls due on the way — in `(due instant, schedule order)`
/// order, with [`now`](Scheduler::now) reading the fire instant while each
/// action runs. Timer actions may themselves schedule or cancel timers and
/// read the clock; they must not re-enter `advance`.
///
/// Clones share the same clock and timer table.
#[derive(Clone)]
pub struct VirtualScheduler {
  core: Arc<Mutex<VirtualCore>>,
}

impl Default for VirtualScheduler {
  fn default() -> Self {
    Self::new()
  }
}

impl VirtualScheduler {
  /// Creates a scheduler with its clock at [`Timestamp::ZERO`] and no
  /// timers.
  pub fn new() -> Self {
    Self {
      core: Arc::new(Mutex::new(VirtualCore {
        now: Timestamp::ZERO,
        next_id: 0,
        timers: Vec::new(),
      })),
    }
  }

  /// Moves the clock forward by `d`, firing everything due on the way.
  pub fn advance(&self, d: Duration) {
    let target = self.now() + d;
    self.advance_to(target);
  }

  /// Moves the clock to `target`, firing everything due on the way.
  ///
  /// A target at or before the current instant only fires timers already
  /// due; the clock never moves backwards.
  pub fn advance_to(&self, target: Timestamp) {
    loop {
      let mut entry = {
        let mut core = self.core.lock().expect("lock");
        core.timers.retain(|t| !t.cancelled.load(Ordering::Acquire));
        let next = core
          .timers
          .iter()
          .enumerate()
          .filter(|(_, t)| t.due <= target)
          .min_by_key(|(_, t)| (t.due, t.id))
          .map(|(i, _)| i);
        let Some(idx) = next else {
          if target > core.now {
            core.now = target;
          }
          return;
        };
        let entry = core.timers.swap_remove(idx);
        if entry.due > core.now {
          core.now = entry.due;
        }
        entry
      };
      // The action runs outside the scheduler lock so it can read the
      // clock or (re)schedule timers.
      (entry.action)(entry.due);
      let mut core = self.core.lock().expect("lock");
      if !entry.cancelled.load(Ordering::Acquire) {
        entry.due = entry.due + entry.period;
        core.timers.push(entry);
      }
    }
  }
}

impl Scheduler for VirtualScheduler {
  fn now(&self) -> Timestamp {
    self.core.lock().expect("lock").now
  }

  fn schedule_periodic(
    &self,
    initial_delay: Duration,
    period: Duration,
    action: TimerAction,
  ) -> Cancelable {
    debug_assert!(period > Duration::ZERO, "periodic timer with zero period");
    let cancelled = Arc::new(AtomicBool::new(false));
    let mut core = self.core.lock().expect("lock");
    let id = core.next_id;
    core.next_id += 1;
    let due = core.now + initial_delay;
    core.timers.push(PeriodicEntry {
      id,
      due,
      period,
      action,
      cancelled: cancelled.clone(),
    });
    drop(core);
    Cancelable::new(move || cancelled.store(true, Ordering::Release))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
  }

  fn fires() -> (Arc<Mutex<Vec<Timestamp>>>, Arc<Mutex<Vec<Timestamp>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    (log.clone(), log)
  }

  #[test]
  fn test_fires_after_initial_delay_then_every_period() {
    let scheduler = VirtualScheduler::new();
    let (log, sink) = fires();
    scheduler.schedule_periodic(
      ms(40),
      ms(40),
      Box::new(move |at| sink.lock().expect("lock").push(at)),
    );
    scheduler.advance_to(Timestamp::from_millis(130));
    assert_eq!(
      *log.lock().expect("lock"),
      vec![
        Timestamp::from_millis(40),
        Timestamp::from_millis(80),
        Timestamp::from_millis(120)
      ]
    );
    assert_eq!(scheduler.now(), Timestamp::from_millis(130));
  }

  #[test]
  fn test_now_reads_fire_instant_inside_action() {
    let scheduler = VirtualScheduler::new();
    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = observed.clone();
    let clock = scheduler.clone();
    scheduler.schedule_periodic(
      ms(10),
      ms(10),
      Box::new(move |_| sink.lock().expect("lock").push(clock.now())),
    );
    scheduler.advance(ms(25));
    assert_eq!(
      *observed.lock().expect("lock"),
      vec![Timestamp::from_millis(10), Timestamp::from_millis(20)]
    );
  }

  #[test]
  fn test_cancel_stops_future_firings() {
    let scheduler = VirtualScheduler::new();
    let (log, sink) = fires();
    let timer = scheduler.schedule_periodic(
      ms(10),
      ms(10),
      Box::new(move |at| sink.lock().expect("lock").push(at)),
    );
    scheduler.advance(ms(15));
    timer.cancel();
    scheduler.advance(ms(50));
    assert_eq!(*log.lock().expect("lock"), vec![Timestamp::from_millis(10)]);
  }

  #[test]
  fn test_simultaneous_timers_fire_in_schedule_order() {
    let scheduler = VirtualScheduler::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    for tag in ["first", "second"] {
      let sink = order.clone();
      scheduler.schedule_periodic(
        ms(10),
        ms(100),
        Box::new(move |_| sink.lock().expect("lock").push(tag)),
      );
    }
    scheduler.advance(ms(10));
    assert_eq!(*order.lock().expect("lock"), vec!["first", "second"]);
  }

  #[test]
  fn test_action_may_cancel_its_own_timer() {
    let scheduler = VirtualScheduler::new();
    let (log, sink) = fires();
    let slot: Arc<Mutex<Option<Cancelable>>> = Arc::new(Mutex::new(None));
    let held = slot.clone();
    let timer = scheduler.schedule_periodic(
      ms(10),
      ms(10),
      Box::new(move |at| {
        sink.lock().expect("lock").push(at);
        if let Some(timer) = held.lock().expect("lock").as_ref() {
          timer.cancel();
        }
      }),
    );
    *slot.lock().expect("lock") = Some(timer);
    scheduler.advance(ms(100));
    assert_eq!(*log.lock().expect("lock"), vec![Timestamp::from_millis(10)]);
  }

  #[test]
  fn test_advance_to_past_instant_does_not_rewind() {
    let scheduler = VirtualScheduler::new();
    scheduler.advance_to(Timestamp::from_millis(50));
    scheduler.advance_to(Timestamp::from_millis(20));
    assert_eq!(scheduler.now(), Timestamp::from_millis(50));
  }
}
