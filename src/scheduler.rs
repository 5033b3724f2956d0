//! The clock-and-timer capability consumed by time-based operators.
//!
//! Operators never read the wall clock directly: they ask a [`Scheduler`]
//! for the current [`Timestamp`] and for a periodic timer. The trait is
//! deliberately narrow so it can be backed either by real tokio timers
//! ([`crate::schedulers::TokioScheduler`]) or by a deterministic
//! manual-advance clock ([`crate::schedulers::VirtualScheduler`]) in tests
//! and simulations.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An opaque logical instant: the offset from the owning scheduler's epoch.
///
/// Timestamps are only meaningful relative to the scheduler that produced
/// them. They are totally ordered, subtractable to a [`Duration`] and
/// shiftable by one, which is all the windowing arithmetic needs. Logical
/// time is not wall-clock time; a virtual scheduler starts at
/// [`Timestamp::ZERO`] and moves only when told to.
#[derive(
  Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(Duration);

impl Timestamp {
  /// The scheduler epoch, the earliest representable instant.
  pub const ZERO: Timestamp = Timestamp(Duration::ZERO);

  /// Creates a timestamp `ms` milliseconds after the epoch.
  #[inline]
  pub const fn from_millis(ms: u64) -> Self {
    Self(Duration::from_millis(ms))
  }

  /// Returns the offset from the scheduler epoch.
  #[inline]
  pub const fn since_epoch(self) -> Duration {
    self.0
  }

  /// Moves this instant `d` earlier, or `None` if that would precede the
  /// epoch.
  #[inline]
  pub fn checked_sub(self, d: Duration) -> Option<Self> {
    self.0.checked_sub(d).map(Self)
  }
}

impl Add<Duration> for Timestamp {
  type Output = Timestamp;

  #[inline]
  fn add(self, rhs: Duration) -> Timestamp {
    Timestamp(self.0 + rhs)
  }
}

impl Sub for Timestamp {
  type Output = Duration;

  /// Elapsed time from `rhs` to `self`, saturating to zero when `rhs` is
  /// the later instant.
  #[inline]
  fn sub(self, rhs: Timestamp) -> Duration {
    self.0.saturating_sub(rhs.0)
  }
}

type CancelAction = Box<dyn FnOnce() + Send>;

/// Handle that stops future firings of a scheduled timer.
///
/// Cancellation is idempotent and best-effort: a tick already executing is
/// not interrupted, but no further ticks fire afterwards.
#[derive(Clone)]
pub struct Cancelable {
  cancelled: Arc<AtomicBool>,
  action: Arc<Mutex<Option<CancelAction>>>,
}

impl Cancelable {
  /// Creates a cancelable that runs `action` on the first cancel.
  pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
    Self {
      cancelled: Arc::new(AtomicBool::new(false)),
      action: Arc::new(Mutex::new(Some(Box::new(action)))),
    }
  }

  /// Creates an already-cancelled handle with nothing to stop.
  pub fn noop() -> Self {
    Self {
      cancelled: Arc::new(AtomicBool::new(true)),
      action: Arc::new(Mutex::new(None)),
    }
  }

  /// Stops future firings. Idempotent.
  pub fn cancel(&self) {
    if self.cancelled.swap(true, Ordering::AcqRel) {
      return;
    }
    let action = self.action.lock().expect("lock").take();
    if let Some(action) = action {
      action();
    }
  }

  /// Returns `true` once the timer has been cancelled.
  pub fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::Acquire)
  }
}

impl std::fmt::Debug for Cancelable {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Cancelable")
      .field("cancelled", &self.is_cancelled())
      .finish()
  }
}

/// Periodic timer callback; receives the logical fire instant.
pub type TimerAction = Box<dyn FnMut(Timestamp) + Send>;

/// A monotonic clock plus periodic timers.
pub trait Scheduler: Send + Sync {
  /// The current logical instant. Monotonically non-decreasing.
  fn now(&self) -> Timestamp;

  /// Schedules `action` to fire first after `initial_delay`, then every
  /// `period`, until the returned [`Cancelable`] is cancelled. Each
  /// invocation receives the logical instant at which it fires.
  fn schedule_periodic(
    &self,
    initial_delay: Duration,
    period: Duration,
    action: TimerAction,
  ) -> Cancelable;
}
