//! # Summary
//!
//! In-process transport for tests: peers are registered by numeric ID
//! against each other's consumer channel, and `make_rpc` is a direct channel
//! round-trip rather than a socket round-trip. A transport can register
//! itself as its own peer, so [`crate::register::RoundRegister`] never needs
//! to special-case "am I talking to myself".

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::internal;
use crate::message::{Command, Response};
use crate::transport::{Rpc, Transport};

/// In-memory, same-process transport keyed by peer ID.
pub struct MemoryTransport<V> {
    id: usize,
    consumer_tx: internal::Tx<Rpc<V>>,
    consumer_rx: Arc<Mutex<Option<internal::Rx<Rpc<V>>>>>,
    peers: Arc<RwLock<HashMap<usize, internal::Tx<Rpc<V>>>>>,
}

impl<V> Clone for MemoryTransport<V> {
    fn clone(&self) -> Self {
        MemoryTransport {
            id: self.id,
            consumer_tx: self.consumer_tx.clone(),
            consumer_rx: Arc::clone(&self.consumer_rx),
            peers: Arc::clone(&self.peers),
        }
    }
}

impl<V> MemoryTransport<V> {
    /// Creates a new, unconnected transport identified by `id`.
    pub fn new(id: usize) -> Self {
        let (rx, tx) = internal::new();
        MemoryTransport {
            id,
            consumer_tx: tx,
            consumer_rx: Arc::new(Mutex::new(Some(rx))),
            peers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers `peer` as reachable under `peer_id` from this transport.
    pub fn connect(&self, peer_id: usize, peer: &MemoryTransport<V>) {
        self.peers.write().insert(peer_id, peer.consumer_tx.clone());
    }

    /// Builds `count` transports with IDs `0..count`, fully meshed
    /// (including self-loops), ready to back a cluster of
    /// [`crate::register::RoundRegister`]s in tests.
    pub fn fully_connected(count: usize) -> Vec<MemoryTransport<V>> {
        let transports: Vec<_> = (0..count).map(MemoryTransport::new).collect();
        for a in &transports {
            for (id, b) in transports.iter().enumerate() {
                a.connect(id, b);
            }
        }
        transports
    }
}

impl<V> Transport for MemoryTransport<V>
where
    V: Clone + Send + Sync + 'static + serde::Serialize + serde::de::DeserializeOwned + std::fmt::Debug,
{
    type Value = V;

    fn consumer(&self) -> internal::Rx<Rpc<V>> {
        self.consumer_rx
            .lock()
            .take()
            .expect("[INTERNAL ERROR]: consumer() called more than once")
    }

    async fn make_rpc(
        &self,
        target: usize,
        command: Command<V>,
        cancel: CancellationToken,
    ) -> Result<Response<V>, Error> {
        let tx = self
            .peers
            .read()
            .get(&target)
            .cloned()
            .ok_or(Error::TransportFailure(target))?;

        let (respond_to, response) = tokio::sync::oneshot::channel();
        tx.try_send(Rpc { command, respond_to });

        tokio::select! {
            result = response => result.map_err(|_| Error::TransportFailure(target)),
            _ = cancel.cancelled() => Err(Error::Cancelled),
        }
    }
}
