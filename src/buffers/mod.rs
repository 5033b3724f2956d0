//! The windowing operators: count/skip and time-based buffering.
//!
//! Both operators consume an [`EventStream`] and produce another
//! [`EventStream`] whose values are windows (`Vec<T>`). An empty window is
//! a valid emission. Exactly one terminal event is relayed, mirroring the
//! source: `Completed` is always preceded by one final flush (possibly
//! empty), an error is forwarded verbatim with nothing flushed.

pub mod count_buffer;
pub mod time_buffer;

pub use count_buffer::{CountBuffer, CountWindowed};
pub use time_buffer::{TimeBuffer, TimeWindowed};

use crate::error::ConfigError;
use crate::scheduler::Scheduler;
use crate::stream::EventStream;
use std::sync::Arc;
use std::time::Duration;

/// Windowing combinators available on every [`EventStream`].
pub trait EventStreamExt<T>: EventStream<T> + Sized {
  /// Windows this stream by element count: each window holds the `count`
  /// most recent elements and a window is emitted every `skip` elements.
  ///
  /// Fails before any subscription if `count` or `skip` is zero.
  fn buffer_count(self, count: usize, skip: usize) -> Result<CountWindowed<Self, T>, ConfigError> {
    Ok(CountBuffer::new(count, skip)?.apply(self))
  }

  /// Windows this stream by time on `scheduler`'s clock: each window
  /// covers the last `time_span` and a window is emitted every
  /// `time_shift`.
  ///
  /// Fails before any subscription if `time_shift` is zero.
  fn buffer_time(
    self,
    time_span: Duration,
    time_shift: Duration,
    scheduler: Arc<dyn Scheduler>,
  ) -> Result<TimeWindowed<Self, T>, ConfigError> {
    Ok(TimeBuffer::new(time_span, time_shift)?.apply(self, scheduler))
  }
}

impl<T, S: EventStream<T>> EventStreamExt<T> for S {}
