//! # Summary
//!
//! The transport abstraction the register and acceptor consume, per spec's
//! external-interfaces boundary: point-to-point RPC delivery between peers,
//! plus a consumer-side stream the local acceptor drains. The core never
//! reaches past this trait into socket or channel details; [`memory`]
//! backs unit and integration tests, [`tcp`] backs real deployments.

pub mod memory;
pub mod tcp;

use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::internal;
use crate::message::{Command, Response};

/// One inbound request: a command to serve, and a one-shot sink for the
/// single response it expects.
pub struct Rpc<V> {
    pub command: Command<V>,
    pub respond_to: tokio::sync::oneshot::Sender<Response<V>>,
}

/// A capability for point-to-point RPC delivery among a fixed peer set.
///
/// Implementations are cheap to clone (an `Arc`-backed handle is typical)
/// since every proposer-side fan-out clones the transport once per peer.
pub trait Transport: Clone + Send + Sync + 'static {
    /// The opaque value type carried by `Write`/`ReadResp` messages.
    type Value: Clone + Send + Sync + 'static + serde::Serialize + serde::de::DeserializeOwned + std::fmt::Debug;

    /// Takes ownership of the stream of RPCs addressed to this peer. Must be
    /// called exactly once; implementations panic on a second call, since
    /// a second acceptor consuming the same stream would split traffic
    /// unpredictably between them.
    fn consumer(&self) -> internal::Rx<Rpc<Self::Value>>;

    /// Sends `command` to `target` and awaits its response. Honors `cancel`:
    /// if it fires before a response arrives, the call returns
    /// `Err(Error::Cancelled)` and abandons any outstanding work for this
    /// send.
    fn make_rpc(
        &self,
        target: usize,
        command: Command<Self::Value>,
        cancel: CancellationToken,
    ) -> impl std::future::Future<Output = Result<Response<Self::Value>, Error>> + Send;
}
