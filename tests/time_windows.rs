//! End-to-end time windowing scenarios on a virtual clock.
//!
//! Each scenario subscribes at tick 200 and delivers the values 1..=6 at
//! ticks 201, 203, 205, 207, 209 and 211, mirroring a hot source that was
//! already running when the windower attached.

use bufferweave::buffers::EventStreamExt;
use bufferweave::event::Event;
use bufferweave::scheduler::{Scheduler, Timestamp};
use bufferweave::schedulers::VirtualScheduler;
use bufferweave::stream::{EventStream, PushStream};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
enum Emitted {
  Window(u64, Vec<i32>),
  Done(u64),
  Failed(u64, String),
}

fn ms(n: u64) -> Duration {
  Duration::from_millis(n)
}

const ARRIVALS: [(u64, i32); 6] = [(201, 1), (203, 2), (205, 3), (207, 4), (209, 5), (211, 6)];

struct Harness {
  scheduler: VirtualScheduler,
  source: PushStream<i32>,
  seen: Arc<Mutex<Vec<Emitted>>>,
}

/// Builds a windower subscribed at tick 200, recording every emission with
/// the tick it was emitted at.
fn harness(time_span: u64, time_shift: u64) -> Harness {
  let _ = tracing_subscriber::fmt().with_test_writer().try_init();
  let scheduler = VirtualScheduler::new();
  scheduler.advance_to(Timestamp::from_millis(200));

  let source: PushStream<i32> = PushStream::new();
  let windowed = source
    .clone()
    .buffer_time(ms(time_span), ms(time_shift), Arc::new(scheduler.clone()))
    .expect("config");

  let seen = Arc::new(Mutex::new(Vec::new()));
  let sink = seen.clone();
  let clock = scheduler.clone();
  // The subscription handle is intentionally discarded: dropping it does
  // not cancel delivery, and these scenarios run to their terminal event.
  let _ = windowed.subscribe(Box::new(move |event| {
    let tick = clock.now().since_epoch().as_millis() as u64;
    let mut log = sink.lock().expect("lock");
    match event {
      Event::Value(window) => log.push(Emitted::Window(tick, window)),
      Event::Completed => log.push(Emitted::Done(tick)),
      Event::Error(error) => log.push(Emitted::Failed(tick, error.to_string())),
    }
  }));

  Harness {
    scheduler,
    source,
    seen,
  }
}

impl Harness {
  fn deliver_all(&self) {
    for (at, value) in ARRIVALS {
      self.scheduler.advance_to(Timestamp::from_millis(at));
      self.source.push(value);
    }
  }

  fn complete_at(&self, tick: u64) {
    self.scheduler.advance_to(Timestamp::from_millis(tick));
    self.source.complete();
  }

  fn emitted(&self) -> Vec<Emitted> {
    self.seen.lock().expect("lock").clone()
  }
}

#[test]
fn test_adjacent_windows_when_span_equals_shift() {
  let h = harness(4, 4);
  h.deliver_all();
  h.complete_at(213);

  assert_eq!(
    h.emitted(),
    vec![
      Emitted::Window(204, vec![1, 2]),
      Emitted::Window(208, vec![3, 4]),
      Emitted::Window(212, vec![5, 6]),
      Emitted::Window(213, vec![]),
      Emitted::Done(213),
    ]
  );
}

#[test]
fn test_overlapping_windows_when_shift_is_less_than_span() {
  let h = harness(6, 4);
  h.deliver_all();
  h.complete_at(213);

  // Value 3 straddles two windows; the final flush covers the tail.
  assert_eq!(
    h.emitted(),
    vec![
      Emitted::Window(206, vec![1, 2, 3]),
      Emitted::Window(210, vec![3, 4, 5]),
      Emitted::Window(213, vec![5, 6]),
      Emitted::Done(213),
    ]
  );
}

#[test]
fn test_gapped_windows_when_shift_exceeds_span() {
  let h = harness(4, 6);
  h.deliver_all();
  h.complete_at(213);

  // Values 3 and 6 fall into the gaps between windows.
  assert_eq!(
    h.emitted(),
    vec![
      Emitted::Window(204, vec![1, 2]),
      Emitted::Window(210, vec![4, 5]),
      Emitted::Window(213, vec![]),
      Emitted::Done(213),
    ]
  );
}

#[test]
fn test_completion_before_the_first_tick_retains_everything() {
  let h = harness(100, 100);
  h.deliver_all();
  h.complete_at(213);

  assert_eq!(
    h.emitted(),
    vec![
      Emitted::Window(213, vec![1, 2, 3, 4, 5, 6]),
      Emitted::Done(213),
    ]
  );
}

#[test]
fn test_empty_stream_still_gets_a_final_flush() {
  let h = harness(4, 4);
  h.complete_at(202);

  assert_eq!(
    h.emitted(),
    vec![Emitted::Window(202, vec![]), Emitted::Done(202)]
  );
}

#[test]
fn test_error_aborts_without_draining_the_buffer() {
  let h = harness(4, 4);
  h.deliver_all();
  h.scheduler.advance_to(Timestamp::from_millis(213));
  h.source
    .fail(Arc::new(std::io::Error::other("upstream gone")));
  // The clock keeps running; nothing further may be emitted.
  h.scheduler.advance_to(Timestamp::from_millis(400));

  assert_eq!(
    h.emitted(),
    vec![
      Emitted::Window(204, vec![1, 2]),
      Emitted::Window(208, vec![3, 4]),
      Emitted::Window(212, vec![5, 6]),
      Emitted::Failed(213, "upstream gone".to_string()),
    ]
  );
}

#[test]
fn test_windows_appear_in_non_decreasing_time_order() {
  let h = harness(6, 4);
  h.deliver_all();
  h.complete_at(213);

  let ticks: Vec<u64> = h
    .emitted()
    .iter()
    .filter_map(|e| match e {
      Emitted::Window(tick, _) => Some(*tick),
      _ => None,
    })
    .collect();
  assert!(ticks.windows(2).all(|pair| pair[0] <= pair[1]));
}
