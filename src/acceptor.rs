//! # Summary
//!
//! This module defines [`Acceptor`], Flease's distributed memory. An
//! acceptor tracks the highest ballot it has promised to a read, the
//! highest ballot it has accepted a write under, and the value from that
//! write, all served from a single serial request loop. The boot-quiescence
//! window substitutes for stable storage: a freshly restarted acceptor
//! sleeps through it before joining quorum again.

use std::time::Duration;

use log::{debug, trace, warn};

use crate::ballot::Ballot;
use crate::message::{Command, ReadCmd, ReadResp, RespKind, Response, WriteCmd, WriteResp};
use crate::transport::Transport;

/// Volatile per-acceptor state: the highest ballot promised to a read, the
/// highest ballot accepted for a write, and the value from that write.
///
/// Invariant A (monotonicity): `k_read` and `k_write` never decrease.
/// Invariant B (safety): a write at ballot `k` is only accepted once a read
/// at `k` has been promised to the same proposer; acceptors enforce their
/// half of this by requiring `k_write <= k_read`, upheld because both
/// fields only ever advance to ballots at least this large.
struct State<V> {
    k_read: Ballot,
    k_write: Ballot,
    value: Option<V>,
}

/// Runs the acceptor side of the round register: a single serial loop
/// draining `transport.consumer()`, so every state transition on
/// `k_read`/`k_write`/`value` is free of additional synchronization.
pub struct Acceptor<V> {
    id: usize,
    state: State<V>,
}

impl<V: Clone + std::fmt::Debug> Acceptor<V> {
    /// Spawns the acceptor's request loop on the current runtime. Before
    /// serving anything, sleeps `quiescence` (`tmax + epsilon`): any lease
    /// a quorum accepted before a crash is guaranteed to have expired by
    /// the time a rebooted acceptor can again contribute to quorum, so no
    /// acknowledgment produced during this window can extend a pre-crash
    /// lease's life (Invariant C).
    pub fn spawn<T>(id: usize, transport: T, quiescence: Duration)
    where
        T: Transport<Value = V> + 'static,
        V: Send + Sync + serde::Serialize + serde::de::DeserializeOwned,
    {
        tokio::spawn(async move {
            debug!("acceptor {} quiescent for {:?}", id, quiescence);
            tokio::time::sleep(quiescence).await;
            debug!("acceptor {} serving", id);

            let mut acceptor = Acceptor {
                id,
                state: State {
                    k_read: Ballot::new(0),
                    k_write: Ballot::new(0),
                    value: None,
                },
            };

            let mut incoming = transport.consumer();
            while let Some(rpc) = incoming.recv().await {
                trace!("acceptor {} received {:?}", id, rpc.command);
                let response = acceptor.handle(rpc.command);
                if rpc.respond_to.send(response).is_err() {
                    warn!("acceptor {} dropped response: requester gone", id);
                }
            }
        });
    }

    fn handle(&mut self, command: Command<V>) -> Response<V> {
        match command {
            Command::Read(read) => Response::Read(self.read(read)),
            Command::Write(write) => Response::Write(self.write(write)),
        }
    }

    /// READ(k): reject if `k <= k_read` or `k <= k_write`; otherwise promise
    /// `k_read <- k` and hand back the last accepted write so the proposer
    /// can adopt it.
    fn read(&mut self, read: ReadCmd) -> ReadResp<V> {
        if read.ballot <= self.state.k_read || read.ballot <= self.state.k_write {
            trace!("acceptor {} nack-read {}", self.id, read.ballot);
            return ReadResp {
                acceptor_id: self.id,
                kind: RespKind::Nack,
                ballot: read.ballot,
                last_write_ballot: self.state.k_write,
                value: None,
            };
        }

        self.state.k_read = read.ballot;
        debug!("acceptor {} ack-read {}", self.id, read.ballot);
        ReadResp {
            acceptor_id: self.id,
            kind: RespKind::Ack,
            ballot: read.ballot,
            last_write_ballot: self.state.k_write,
            value: self.state.value.clone(),
        }
    }

    /// WRITE(k, v): reject if `k_read > k` or `k_write > k` (an equal
    /// ballot is the one we just promised, so it is accepted, making
    /// retransmitted reads/writes at the same ballot duplicate-safe).
    /// Otherwise accept: `k_write <- k`, `value <- v`.
    fn write(&mut self, write: WriteCmd<V>) -> WriteResp {
        if self.state.k_read > write.ballot || self.state.k_write > write.ballot {
            trace!("acceptor {} nack-write {}", self.id, write.ballot);
            return WriteResp {
                acceptor_id: self.id,
                kind: RespKind::Nack,
                ballot: self.state.k_write,
            };
        }

        self.state.k_write = write.ballot;
        self.state.value = Some(write.value);
        debug!("acceptor {} ack-write {}", self.id, write.ballot);
        WriteResp {
            acceptor_id: self.id,
            kind: RespKind::Ack,
            ballot: write.ballot,
        }
    }
}
