//! # Bufferweave
//!
//! Sliding-window buffering operators for push-based event streams.
//!
//! Bufferweave repackages a stream of discrete values into overlapping or
//! disjoint windows and re-emits each window as a single batched value.
//! Two independent strategies are provided:
//!
//! - **Count/skip windowing** ([`buffers::CountBuffer`]): emit the `count`
//!   most recent elements every `skip` elements — a pure, synchronous
//!   state machine that runs inline with event delivery.
//! - **Time windowing** ([`buffers::TimeBuffer`]): emit everything that
//!   arrived in the last `time_span`, every `time_shift`, driven by a
//!   [`scheduler::Scheduler`]'s periodic timer.
//!
//! Operators consume and produce the same narrow capability,
//! [`stream::EventStream`], so they compose with anything that can push
//! [`event::Event`]s — including the bundled [`stream::PushStream`] pipe
//! and the [`adapters`] that bridge to `futures::Stream`.
//!
//! ## Quick Start
//!
//! ```rust
//! use bufferweave::buffers::EventStreamExt;
//! use bufferweave::event::Event;
//! use bufferweave::stream::{EventStream, PushStream};
//!
//! # fn main() -> Result<(), bufferweave::error::ConfigError> {
//! let source: PushStream<i32> = PushStream::new();
//! let windowed = source.clone().buffer_count(2, 2)?;
//! windowed.subscribe(Box::new(|event| {
//!   if let Event::Value(window) = event {
//!     println!("window: {window:?}");
//!   }
//! }));
//! source.push(1);
//! source.push(2); // prints "window: [1, 2]"
//! source.complete();
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

/// Bridges between push-based event streams and `futures::Stream`.
pub mod adapters;
/// The count/skip and time windowing operators.
pub mod buffers;
/// Configuration errors raised at operator construction.
pub mod error;
/// The event vocabulary delivered to stream handlers.
pub mod event;
/// The clock-and-timer capability consumed by time-based operators.
pub mod scheduler;
/// Concrete schedulers: tokio-backed and virtual-time.
pub mod schedulers;
/// The push-based stream capability and subscription handling.
pub mod stream;

pub use buffers::{CountBuffer, EventStreamExt, TimeBuffer};
pub use error::ConfigError;
pub use event::{Event, SourceError};
pub use scheduler::{Cancelable, Scheduler, Timestamp};
pub use stream::{EventStream, PushStream, Subscription};
