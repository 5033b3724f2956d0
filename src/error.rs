//! Configuration errors raised before any subscription is established.
//!
//! Once an operator is constructed successfully there are no internally
//! generated runtime errors: every later failure observed downstream is an
//! upstream error relayed verbatim (see [`crate::event::SourceError`]).

use std::time::Duration;
use thiserror::Error;

/// Invalid operator parameters, reported at construction time.
///
/// These are fatal and never retried: an operator that fails validation is
/// simply never built, so no subscription or timer is created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
  /// `count` must be at least 1; a zero-capacity window can never emit.
  #[error("window `count` must be greater than zero")]
  InvalidCount,
  /// `skip` must be at least 1; a zero advance would re-emit the same
  /// window forever.
  #[error("window `skip` must be greater than zero")]
  InvalidSkip,
  /// `time_shift` must be non-zero; a zero period would fire the flush
  /// timer continuously.
  #[error("window `time_shift` must be greater than zero (got {0:?})")]
  InvalidTimeShift(Duration),
}
