//! Count/skip windowing: emit the `count` most recent elements every
//! `skip` elements.
//!
//! A single countdown-and-reset pass implements all three regimes without
//! branching on the relative size of the parameters: `skip == count` gives
//! disjoint windows, `skip < count` overlapping windows, `skip > count`
//! gap sampling. The FIFO-capped buffer holds the candidate window and the
//! step counter decides when to emit it.

use crate::error::ConfigError;
use crate::event::Event;
use crate::stream::{EventHandler, EventStream, Subscription};
use std::collections::VecDeque;
use std::marker::PhantomData;

/// Owned per-subscription state for the count/skip pass.
///
/// One mutating method per event kind; emissions are returned to the
/// caller rather than produced as side effects, which keeps the machine
/// trivially testable.
struct CountState<T> {
  window: VecDeque<T>,
  step: usize,
  count: usize,
  skip: usize,
}

impl<T: Clone> CountState<T> {
  fn new(count: usize, skip: usize) -> Self {
    Self {
      window: VecDeque::with_capacity(count + 1),
      step: count,
      count,
      skip,
    }
  }

  /// Absorbs one element; returns the finished window when the countdown
  /// reaches zero.
  fn on_value(&mut self, value: T) -> Option<Vec<T>> {
    let new_step = self.step - 1;
    self.window.push_back(value);
    if self.window.len() > self.count {
      self.window.pop_front();
    }
    if new_step == 0 {
      self.step = self.skip;
      Some(self.window.iter().cloned().collect())
    } else {
      self.step = new_step;
      None
    }
  }

  /// Returns the final flush: the buffered tail that has not yet been
  /// emitted.
  ///
  /// The kept suffix has length `count - step`, clamped to zero — a stream
  /// that completes right after a trigger-and-reset with `skip > count`
  /// flushes an empty window instead of underflowing.
  fn on_completed(&mut self) -> Vec<T> {
    let keep = self.count.saturating_sub(self.step);
    while self.window.len() > keep {
      self.window.pop_front();
    }
    self.window.drain(..).collect()
  }
}

/// Configuration for count/skip windowing.
///
/// Validated at construction: both `count` and `skip` must be at least 1.
/// Apply it to a source with [`apply`](CountBuffer::apply) or through
/// [`EventStreamExt::buffer_count`](crate::buffers::EventStreamExt::buffer_count).
#[derive(Debug, Clone)]
pub struct CountBuffer {
  count: usize,
  skip: usize,
  name: Option<String>,
}

impl CountBuffer {
  /// Creates a validated count/skip configuration.
  ///
  /// # Arguments
  ///
  /// * `count` - Number of most-recent elements each window holds.
  /// * `skip` - Number of elements between consecutive windows.
  pub fn new(count: usize, skip: usize) -> Result<Self, ConfigError> {
    if count == 0 {
      return Err(ConfigError::InvalidCount);
    }
    if skip == 0 {
      return Err(ConfigError::InvalidSkip);
    }
    Ok(Self {
      count,
      skip,
      name: None,
    })
  }

  /// Sets the name used to identify this operator in logs.
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// Returns the window capacity.
  pub fn count(&self) -> usize {
    self.count
  }

  /// Returns the advance between windows.
  pub fn skip(&self) -> usize {
    self.skip
  }

  /// Wraps `source`, producing a stream of windows.
  pub fn apply<T, S>(&self, source: S) -> CountWindowed<S, T>
  where
    S: EventStream<T>,
  {
    CountWindowed {
      source,
      count: self.count,
      skip: self.skip,
      name: self.name.clone(),
      _phantom: PhantomData,
    }
  }
}

/// A source wrapped with count/skip windowing.
///
/// Each [`subscribe`](EventStream::subscribe) runs an independent
/// count/skip pass over the source: windows are emitted inline with
/// event delivery, a completion flushes the unfinished tail (possibly
/// empty) before the terminal event, and an upstream error is relayed
/// immediately without flushing.
pub struct CountWindowed<S, T> {
  source: S,
  count: usize,
  skip: usize,
  name: Option<String>,
  _phantom: PhantomData<fn() -> T>,
}

impl<S, T> EventStream<Vec<T>> for CountWindowed<S, T>
where
  S: EventStream<T>,
  T: Clone + Send + 'static,
{
  fn subscribe(&self, mut downstream: EventHandler<Vec<T>>) -> Subscription {
    tracing::debug!(
      operator = self.name.as_deref(),
      count = self.count,
      skip = self.skip,
      "starting count windower"
    );
    let mut state = CountState::new(self.count, self.skip);
    self.source.subscribe(Box::new(move |event| match event {
      Event::Value(value) => {
        if let Some(window) = state.on_value(value) {
          downstream(Event::Value(window));
        }
      }
      Event::Completed => {
        downstream(Event::Value(state.on_completed()));
        downstream(Event::Completed);
      }
      Event::Error(error) => downstream(Event::Error(error)),
    }))
  }
}
