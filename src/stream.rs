//! The push-based stream capability and its concrete single-consumer pipe.
//!
//! # Overview
//!
//! A source of events is anything implementing [`EventStream`]: callers hand
//! it an [`EventHandler`] and get back a [`Subscription`] that stops further
//! delivery when cancelled. The delivery contract is narrow:
//!
//! - events arrive in push order;
//! - at most one terminal event ([`Event::Completed`] or [`Event::Error`])
//!   is ever delivered;
//! - nothing is delivered after a terminal event or after cancellation.
//!
//! [`PushStream`] is the concrete pipe used for wiring operators and tests.
//! It serializes delivery through a FIFO drain loop: a handler that
//! synchronously pushes back into the pipe does not re-enter itself — the
//! nested event is queued and delivered after the in-flight callback
//! returns. Operators downstream can therefore guard their state with a
//! plain mutex instead of a re-entrant lock.

use crate::event::{Event, SourceError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Callback invoked once per delivered event.
pub type EventHandler<T> = Box<dyn FnMut(Event<T>) + Send>;

/// A push-based source of [`Event`]s with a single active consumer.
pub trait EventStream<T>: Send {
  /// Registers `handler` to receive every subsequent event.
  ///
  /// The returned [`Subscription`] stops delivery when cancelled. Each
  /// stream has at most one active consumer; subscribing again displaces
  /// the previous handler.
  fn subscribe(&self, handler: EventHandler<T>) -> Subscription;
}

type Teardown = Box<dyn FnOnce() + Send>;

/// Handle that tears down a subscription.
///
/// Cancellation is idempotent: the teardown runs on the first
/// [`cancel`](Subscription::cancel) and later calls are no-ops. A single
/// subscription may own several teardown actions (e.g. a source
/// subscription and a timer) which are released together.
#[derive(Clone)]
pub struct Subscription {
  teardown: Arc<Mutex<Option<Teardown>>>,
}

impl Subscription {
  /// Creates a subscription that runs `teardown` when cancelled.
  pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
    Self {
      teardown: Arc::new(Mutex::new(Some(Box::new(teardown)))),
    }
  }

  /// Creates an already-released subscription with nothing to tear down.
  pub fn empty() -> Self {
    Self {
      teardown: Arc::new(Mutex::new(None)),
    }
  }

  /// Stops further delivery. Idempotent.
  pub fn cancel(&self) {
    let action = self.teardown.lock().expect("lock").take();
    if let Some(action) = action {
      action();
    }
  }

  /// Returns `true` once [`cancel`](Subscription::cancel) has run (or the
  /// subscription was created empty).
  pub fn is_cancelled(&self) -> bool {
    self.teardown.lock().expect("lock").is_none()
  }
}

impl std::fmt::Debug for Subscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("cancelled", &self.is_cancelled())
      .finish()
  }
}

struct PipeCore<T> {
  handler: Option<EventHandler<T>>,
  /// Bumped on every subscribe so a stale subscription cannot detach a
  /// newer handler.
  epoch: u64,
  queue: VecDeque<Event<T>>,
  draining: bool,
  terminated: bool,
}

/// A single-producer, single-consumer event pipe.
///
/// `PushStream` is the concrete [`EventStream`] used to feed operators:
/// call [`push`](PushStream::push), [`complete`](PushStream::complete) or
/// [`fail`](PushStream::fail) from the producing side. Events pushed while
/// no handler is attached are discarded, and the pipe latches after its
/// first terminal event — later pushes are ignored, preserving the
/// at-most-one-terminal contract.
pub struct PushStream<T> {
  core: Arc<Mutex<PipeCore<T>>>,
}

impl<T> Clone for PushStream<T> {
  fn clone(&self) -> Self {
    Self {
      core: self.core.clone(),
    }
  }
}

impl<T: Send + 'static> Default for PushStream<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Send + 'static> PushStream<T> {
  /// Creates an empty pipe with no subscriber.
  pub fn new() -> Self {
    Self {
      core: Arc::new(Mutex::new(PipeCore {
        handler: None,
        epoch: 0,
        queue: VecDeque::new(),
        draining: false,
        terminated: false,
      })),
    }
  }

  /// Delivers a value to the subscriber, if any.
  pub fn push(&self, value: T) {
    self.dispatch(Event::Value(value));
  }

  /// Ends the stream normally. Terminal; later events are ignored.
  pub fn complete(&self) {
    self.dispatch(Event::Completed);
  }

  /// Ends the stream with an upstream error. Terminal; later events are
  /// ignored.
  pub fn fail(&self, error: SourceError) {
    self.dispatch(Event::Error(error));
  }

  fn dispatch(&self, event: Event<T>) {
    let mut core = self.core.lock().expect("lock");
    if core.terminated {
      return;
    }
    if event.is_terminal() {
      core.terminated = true;
    }
    core.queue.push_back(event);
    if core.draining {
      // A delivery further up the call stack owns the drain loop; it will
      // pick this event up once the in-flight handler returns.
      return;
    }
    core.draining = true;
    while let Some(event) = core.queue.pop_front() {
      let Some(mut handler) = core.handler.take() else {
        // No consumer attached: the event is dropped.
        continue;
      };
      let epoch = core.epoch;
      let terminal = event.is_terminal();
      drop(core);
      handler(event);
      core = self.core.lock().expect("lock");
      // Restore the handler unless the stream just ended or the consumer
      // resubscribed/cancelled while the callback was running.
      if !terminal && core.epoch == epoch && core.handler.is_none() {
        core.handler = Some(handler);
      }
    }
    core.draining = false;
  }
}

impl<T: Send + 'static> EventStream<T> for PushStream<T> {
  fn subscribe(&self, handler: EventHandler<T>) -> Subscription {
    let mut core = self.core.lock().expect("lock");
    core.epoch += 1;
    core.handler = Some(handler);
    let epoch = core.epoch;
    drop(core);

    let core = self.core.clone();
    Subscription::new(move || {
      let mut core = core.lock().expect("lock");
      if core.epoch == epoch {
        core.handler = None;
        // Invalidate the epoch so an in-flight drain does not restore the
        // handler it took out before this cancel ran.
        core.epoch += 1;
      }
    })
  }
}
