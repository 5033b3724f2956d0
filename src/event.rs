//! The event vocabulary shared by sources and operators.
//!
//! Every stream in bufferweave delivers a sequence of [`Event`]s: zero or
//! more `Value`s followed by at most one terminal event (`Completed` or
//! `Error`). Nothing is ever delivered after a terminal event.

use std::sync::Arc;

/// Error payload carried by [`Event::Error`].
///
/// Upstream errors are relayed verbatim; the `Arc` makes the payload
/// clonable so it can cross handler boundaries without re-wrapping.
pub type SourceError = Arc<dyn std::error::Error + Send + Sync>;

/// A single notification delivered to a stream handler.
#[derive(Debug, Clone)]
pub enum Event<T> {
  /// A data element.
  Value(T),
  /// The stream ended normally. Terminal.
  Completed,
  /// The stream ended with an upstream failure. Terminal.
  Error(SourceError),
}

impl<T> Event<T> {
  /// Returns `true` for `Completed` and `Error`, the two variants that end
  /// a stream.
  #[inline]
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Completed | Self::Error(_))
  }

  /// Returns `Some(&T)` if this is a `Value`, otherwise `None`.
  #[inline]
  pub fn value(&self) -> Option<&T> {
    match self {
      Self::Value(v) => Some(v),
      _ => None,
    }
  }

  /// Consumes the event, returning the value if this is a `Value`.
  #[inline]
  pub fn into_value(self) -> Option<T> {
    match self {
      Self::Value(v) => Some(v),
      _ => None,
    }
  }
}
