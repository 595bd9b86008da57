//! # Summary
//!
//! Thin wrapper around `tokio::sync::mpsc`'s unbounded channel, used for the
//! internal hand-off between a transport's connection-handling tasks and the
//! single acceptor loop that consumes them. Kept as its own module so the
//! channel type backing intra-process hand-off can change without touching
//! callers.

use tokio::sync::mpsc;

/// Receiving end of an internal channel.
pub struct Rx<T>(mpsc::UnboundedReceiver<T>);

/// Transmitting end of an internal channel. Clones all send to the same
/// receiving end.
#[derive(Derivative)]
#[derivative(Clone(bound = ""))]
pub struct Tx<T>(mpsc::UnboundedSender<T>);

/// Creates a new linked pair of internal channels.
pub fn new<T>() -> (Rx<T>, Tx<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Rx(rx), Tx(tx))
}

impl<T> Rx<T> {
    /// Awaits the next message, or `None` once every `Tx` has been dropped.
    pub async fn recv(&mut self) -> Option<T> {
        self.0.recv().await
    }
}

impl<T> Tx<T> {
    /// Attempts to send a message. Does nothing if the receiving end has
    /// been dropped, since that only happens when the owning task has shut
    /// down intentionally.
    pub fn try_send(&self, message: T) {
        let _ = self.0.send(message);
    }
}
