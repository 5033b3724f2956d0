//! Bridges between push-based [`EventStream`]s and pull-based
//! [`futures::Stream`]s.
//!
//! These adapters are how the operators plug into an async pipeline: feed
//! a source from any `futures::Stream` with [`from_stream`], or consume a
//! windowed output as a `futures::Stream` with [`into_stream`].

use crate::event::Event;
use crate::stream::{EventStream, PushStream, Subscription};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Subscribes to `source` and exposes its events as a [`futures::Stream`].
///
/// The stream yields every event in delivery order and ends after the
/// terminal event. Dropping the stream alone does not unsubscribe; cancel
/// the returned [`Subscription`] to stop delivery early.
pub fn into_stream<T, S>(source: &S) -> (impl Stream<Item = Event<T>> + Send + Unpin, Subscription)
where
  S: EventStream<T>,
  T: Send + 'static,
{
  let (tx, rx) = mpsc::unbounded_channel();
  let mut tx = Some(tx);
  let sub = source.subscribe(Box::new(move |event| {
    if let Some(sender) = &tx {
      let terminal = event.is_terminal();
      let _ = sender.send(event);
      if terminal {
        // Closing the channel ends the pull side right after the
        // terminal event.
        tx = None;
      }
    }
  }));
  (UnboundedReceiverStream::new(rx), sub)
}

/// Drives `sink` from a [`futures::Stream`] on a spawned tokio task.
///
/// Every item is pushed in order; when the stream is exhausted the sink is
/// completed. Must be called from within a tokio runtime.
pub fn from_stream<T, St>(stream: St, sink: PushStream<T>) -> tokio::task::JoinHandle<()>
where
  St: Stream<Item = T> + Send + 'static,
  T: Send + 'static,
{
  tokio::spawn(async move {
    let mut stream = std::pin::pin!(stream);
    while let Some(item) = stream.next().await {
      sink.push(item);
    }
    sink.complete();
  })
}
