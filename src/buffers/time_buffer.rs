//! Time windowing: emit everything that arrived in the last `time_span`,
//! every `time_shift`, on a scheduler's clock.
//!
//! Two producers feed one piece of state: the source stream records
//! arrivals, a periodic timer flushes windows. Both callbacks run inside
//! the same mutex-guarded critical section, so windows are emitted in
//! non-decreasing logical-time order no matter which execution context a
//! callback arrives on. Because `time_span` and `time_shift` are
//! independent, a shorter shift produces overlapping windows whose entries
//! survive across ticks, while a longer shift prunes aggressively and
//! leaves gaps.

use crate::error::ConfigError;
use crate::event::Event;
use crate::scheduler::{Cancelable, Scheduler, Timestamp};
use crate::stream::{EventHandler, EventStream, Subscription};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mutex-guarded state shared by the source callback and the timer
/// callback of one subscription.
///
/// `entries` is an ordered sequence of `(arrival instant, value)` pairs,
/// non-decreasing in time. Values arriving at an identical clock reading
/// are all retained, in arrival order; retention is a prefix trim.
struct TimeState<T> {
  entries: Vec<(Timestamp, T)>,
  last_emit: Option<Timestamp>,
  timer: Option<Cancelable>,
  downstream: EventHandler<Vec<T>>,
  done: bool,
}

impl<T: Clone> TimeState<T> {
  fn record(&mut self, at: Timestamp, value: T) {
    debug_assert!(self.entries.last().is_none_or(|(t, _)| *t <= at));
    self.entries.push((at, value));
  }

  /// Drops every entry at or before `cutoff`. `None` keeps everything.
  fn trim_through(&mut self, cutoff: Option<Timestamp>) {
    if let Some(cutoff) = cutoff {
      let keep_from = self.entries.partition_point(|(t, _)| *t <= cutoff);
      self.entries.drain(..keep_from);
    }
  }

  fn snapshot(&self) -> Vec<T> {
    self.entries.iter().map(|(_, v)| v.clone()).collect()
  }
}

/// Retention cutoff for the final flush at completion time.
///
/// The final window is widened to `(now - last_emit) + time_span -
/// time_shift`: exactly the elapsed time since the previous emission plus
/// one span, so a stream ending between ticks still covers its trailing
/// partial interval without re-including already-emitted data. Before any
/// tick has fired there is nothing to avoid re-including, so everything
/// buffered is retained.
fn final_cutoff(
  now: Timestamp,
  last_emit: Option<Timestamp>,
  time_span: Duration,
  time_shift: Duration,
) -> Option<Timestamp> {
  let last = last_emit?;
  let widened = (now - last) + time_span;
  match widened.checked_sub(time_shift) {
    // The shift outruns the widened span: the final window is empty.
    None => Some(now),
    Some(span) => now.checked_sub(span),
  }
}

/// Configuration for time windowing.
///
/// Validated at construction: `time_shift` must be non-zero. `time_span`
/// may be greater than, equal to, or less than `time_shift`; the three
/// relations produce overlapping, adjacent, or gapped windows. Apply it to
/// a source with [`apply`](TimeBuffer::apply) or through
/// [`EventStreamExt::buffer_time`](crate::buffers::EventStreamExt::buffer_time).
#[derive(Debug, Clone)]
pub struct TimeBuffer {
  time_span: Duration,
  time_shift: Duration,
  name: Option<String>,
}

impl TimeBuffer {
  /// Creates a validated time-window configuration.
  ///
  /// # Arguments
  ///
  /// * `time_span` - How far back each window reaches.
  /// * `time_shift` - How often a window is emitted.
  pub fn new(time_span: Duration, time_shift: Duration) -> Result<Self, ConfigError> {
    if time_shift.is_zero() {
      return Err(ConfigError::InvalidTimeShift(time_shift));
    }
    Ok(Self {
      time_span,
      time_shift,
      name: None,
    })
  }

  /// Sets the name used to identify this operator in logs.
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// Returns the window reach.
  pub fn time_span(&self) -> Duration {
    self.time_span
  }

  /// Returns the emission period.
  pub fn time_shift(&self) -> Duration {
    self.time_shift
  }

  /// Wraps `source`, producing a stream of windows driven by `scheduler`.
  pub fn apply<T, S>(&self, source: S, scheduler: Arc<dyn Scheduler>) -> TimeWindowed<S, T>
  where
    S: EventStream<T>,
  {
    TimeWindowed {
      source,
      time_span: self.time_span,
      time_shift: self.time_shift,
      scheduler,
      name: self.name.clone(),
      _phantom: PhantomData,
    }
  }
}

/// A source wrapped with time windowing.
///
/// Each [`subscribe`](EventStream::subscribe) subscribes the source and
/// schedules a periodic timer that first fires after `time_span`, then
/// every `time_shift`. Completion acts as an unscheduled final tick with a
/// widened span; an upstream error is relayed immediately without
/// flushing. Cancelling the returned subscription tears down the source
/// subscription and the timer together.
pub struct TimeWindowed<S, T> {
  source: S,
  time_span: Duration,
  time_shift: Duration,
  scheduler: Arc<dyn Scheduler>,
  name: Option<String>,
  _phantom: PhantomData<fn() -> T>,
}

impl<S, T> EventStream<Vec<T>> for TimeWindowed<S, T>
where
  S: EventStream<T>,
  T: Clone + Send + 'static,
{
  fn subscribe(&self, downstream: EventHandler<Vec<T>>) -> Subscription {
    tracing::debug!(
      operator = self.name.as_deref(),
      time_span = ?self.time_span,
      time_shift = ?self.time_shift,
      "starting time windower"
    );
    let shared = Arc::new(Mutex::new(TimeState {
      entries: Vec::new(),
      last_emit: None,
      timer: None,
      downstream,
      done: false,
    }));

    let state = shared.clone();
    let scheduler = self.scheduler.clone();
    let time_span = self.time_span;
    let time_shift = self.time_shift;
    let source_sub = self.source.subscribe(Box::new(move |event| {
      let mut state = state.lock().expect("lock");
      if state.done {
        return;
      }
      let now = scheduler.now();
      match event {
        Event::Value(value) => state.record(now, value),
        Event::Completed => {
          let cutoff = final_cutoff(now, state.last_emit, time_span, time_shift);
          state.trim_through(cutoff);
          let window = state.snapshot();
          state.done = true;
          if let Some(timer) = state.timer.take() {
            timer.cancel();
          }
          (state.downstream)(Event::Value(window));
          (state.downstream)(Event::Completed);
        }
        Event::Error(error) => {
          state.done = true;
          if let Some(timer) = state.timer.take() {
            timer.cancel();
          }
          (state.downstream)(Event::Error(error));
        }
      }
    }));

    let state = shared.clone();
    let timer = self.scheduler.schedule_periodic(
      self.time_span,
      self.time_shift,
      Box::new(move |now| {
        let mut state = state.lock().expect("lock");
        if state.done {
          return;
        }
        // Entries older than one span can never appear in a future window.
        state.trim_through(now.checked_sub(time_span));
        let window = state.snapshot();
        state.last_emit = Some(now);
        tracing::trace!(at = ?now, len = window.len(), "periodic flush");
        (state.downstream)(Event::Value(window));
      }),
    );

    {
      let mut state = shared.lock().expect("lock");
      if state.done {
        // The source terminated before the timer handle landed.
        timer.cancel();
      } else {
        state.timer = Some(timer.clone());
      }
    }

    Subscription::new(move || {
      {
        let mut state = shared.lock().expect("lock");
        state.done = true;
        state.timer = None;
      }
      timer.cancel();
      source_sub.cancel();
    })
  }
}
