//! # Summary
//!
//! Networked transport for real deployments: one TCP connection per ordered
//! peer pair, length-delimited `bincode` framing over `tokio`. A background
//! task per connection drains inbound frames into the shared consumer
//! channel and, for requests this peer issues, matches replies back to the
//! right `oneshot` sender by request ID.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::internal;
use crate::message::{Command, Response};
use crate::transport::{Rpc, Transport};

/// Envelope placed on the wire: a request carries a caller-assigned ID so
/// the reply can be matched back to the right waiter; a reply just echoes
/// that ID alongside the response.
#[derive(Serialize, Deserialize)]
enum Frame<V> {
    Request { id: u64, from: usize, command: Command<V> },
    Reply { id: u64, response: Response<V> },
}

struct Shared<V> {
    id: usize,
    consumer_tx: internal::Tx<Rpc<V>>,
    consumer_rx: Mutex<Option<internal::Rx<Rpc<V>>>>,
    /// Frame senders for each established outbound connection.
    outbound: RwLock<HashMap<usize, tokio::sync::mpsc::UnboundedSender<Frame<V>>>>,
    /// Waiters for in-flight requests we issued, keyed by request ID.
    pending: Mutex<HashMap<u64, oneshot::Sender<Response<V>>>>,
    next_request_id: AtomicU64,
    response_send_deadline: Duration,
}

/// TCP-backed transport. Connects eagerly to every peer with a numerically
/// greater ID at construction and accepts inbound connections from peers
/// with a lesser ID, so each ordered pair opens exactly one socket. A
/// request addressed to this transport's own ID never touches a socket at
/// all; it loops directly back to the local consumer channel.
pub struct TcpTransport<V>(Arc<Shared<V>>);

impl<V> Clone for TcpTransport<V> {
    fn clone(&self) -> Self {
        TcpTransport(Arc::clone(&self.0))
    }
}

impl<V> TcpTransport<V>
where
    V: Clone + Send + Sync + 'static + Serialize + for<'de> Deserialize<'de> + std::fmt::Debug,
{
    /// Binds `addrs[&id]` and begins connecting to every other address in
    /// `addrs`. Returns once the listener is bound; peer connections are
    /// established in the background and narrowcasts simply fail with
    /// `Error::TransportFailure` until they come up.
    pub async fn bind(
        id: usize,
        addrs: HashMap<usize, SocketAddr>,
        response_send_deadline: Duration,
    ) -> std::io::Result<Self> {
        let (rx, tx) = internal::new();
        let shared = Arc::new(Shared {
            id,
            consumer_tx: tx,
            consumer_rx: Mutex::new(Some(rx)),
            outbound: RwLock::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            next_request_id: AtomicU64::new(0),
            response_send_deadline,
        });
        let transport = TcpTransport(shared);

        let listener = TcpListener::bind(addrs[&id]).await?;
        let accepting = transport.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer_addr)) => {
                        debug!("accepted connection from {}", peer_addr);
                        accepting.clone().spawn_connection(stream);
                    }
                    Err(error) => {
                        warn!("accept failed: {}", error);
                        return;
                    }
                }
            }
        });

        for (&peer_id, &addr) in addrs.iter().filter(|&(&peer_id, _)| peer_id > id) {
            let transport = transport.clone();
            tokio::spawn(async move {
                loop {
                    match TcpStream::connect(addr).await {
                        Ok(stream) => {
                            info!("connected to {}", peer_id);
                            transport.clone().spawn_connection(stream);
                            return;
                        }
                        Err(_) => tokio::time::sleep(Duration::from_millis(200)).await,
                    }
                }
            });
        }

        Ok(transport)
    }

    /// Spawns the read/write loop for one established connection and
    /// registers its outbound sender so `make_rpc` can address it.
    fn spawn_connection(self, stream: TcpStream) {
        let codec = Framed::new(stream, LengthDelimitedCodec::new());
        let (mut sink, mut stream) = codec.split();
        let (frame_tx, mut frame_rx) = tokio::sync::mpsc::unbounded_channel::<Frame<V>>();

        let writer = async move {
            while let Some(frame) = frame_rx.recv().await {
                let Ok(bytes) = bincode::serialize(&frame) else { continue };
                if sink.send(Bytes::from(bytes)).await.is_err() {
                    return;
                }
            }
        };
        tokio::spawn(writer);

        let deadline = self.0.response_send_deadline;
        let reader_shared = Arc::clone(&self.0);
        tokio::spawn(async move {
            while let Some(Ok(bytes)) = stream.next().await {
                let Ok(frame) = bincode::deserialize::<Frame<V>>(&bytes) else {
                    warn!("dropping malformed frame");
                    continue;
                };
                match frame {
                    Frame::Request { id, from, command } => {
                        reader_shared
                            .outbound
                            .write()
                            .entry(from)
                            .or_insert_with(|| frame_tx.clone());
                        let (respond_to, response) = oneshot::channel();
                        reader_shared.consumer_tx.try_send(Rpc { command, respond_to });
                        let frame_tx = frame_tx.clone();
                        tokio::spawn(async move {
                            if let Ok(Ok(response)) = tokio::time::timeout(deadline, response).await {
                                frame_tx.send(Frame::Reply { id, response }).ok();
                            }
                        });
                    }
                    Frame::Reply { id, response } => {
                        if let Some(waiter) = reader_shared.pending.lock().remove(&id) {
                            let _ = waiter.send(response);
                        }
                    }
                }
            }
        });
    }
}

impl<V> Transport for TcpTransport<V>
where
    V: Clone + Send + Sync + 'static + Serialize + for<'de> Deserialize<'de> + std::fmt::Debug,
{
    type Value = V;

    fn consumer(&self) -> internal::Rx<Rpc<V>> {
        self.0
            .consumer_rx
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
        if target == self.0.id {
            // No socket connects a peer to itself; hand the request straight
            // to our own consumer channel, mirroring the in-memory transport.
            let (respond_to, response) = oneshot::channel();
            self.0.consumer_tx.try_send(Rpc { command, respond_to });
            return tokio::select! {
                result = response => result.map_err(|_| Error::TransportFailure(target)),
                _ = cancel.cancelled() => Err(Error::Cancelled),
            };
        }

        let frame_tx = self
            .0
            .outbound
            .read()
            .get(&target)
            .cloned()
            .ok_or(Error::TransportFailure(target))?;

        let id = self.0.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (respond_to, response) = oneshot::channel();
        self.0.pending.lock().insert(id, respond_to);

        if frame_tx
            .send(Frame::Request { id, from: self.0.id, command })
            .is_err()
        {
            self.0.pending.lock().remove(&id);
            return Err(Error::TransportFailure(target));
        }

        tokio::select! {
            result = response => result.map_err(|_| Error::TransportFailure(target)),
            _ = cancel.cancelled() => {
                self.0.pending.lock().remove(&id);
                Err(Error::Cancelled)
            }
        }
    }
}
