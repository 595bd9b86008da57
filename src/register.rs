//! # Summary
//!
//! This module defines [`RoundRegister`], the proposer side of the round
//! register: `read`/`write` phases that fan a command out to every peer in
//! parallel and return once a quorum has responded. Each phase is a single
//! one-shot attempt rather than a persistent, retrying actor — Flease
//! itself decides when a retry with a fresh ballot is warranted, so the
//! phases here never retry internally.

use log::trace;
use tokio_util::sync::CancellationToken;

use crate::ballot::Ballot;
use crate::config::RegisterConfig;
use crate::error::Error;
use crate::message::{Command, ReadCmd, RespKind, Response, WriteCmd};
use crate::transport::Transport;

/// Size of a quorum out of `n` peers: any two quorums intersect.
pub fn quorum_size(n: usize) -> usize {
    n / 2 + 1
}

/// Proposer side of a single-shot Paxos round register over an opaque
/// value `T::Value`. One instance is owned per local peer process; it
/// plays client to every acceptor in `peers`, including its own.
#[derive(Clone)]
pub struct RoundRegister<T: Transport> {
    peers: Vec<usize>,
    transport: T,
    config: RegisterConfig,
}

impl<T: Transport> RoundRegister<T> {
    /// Creates a register over the given peer set, including this
    /// process's own ID, registered as just another acceptor so the
    /// proposer side never special-cases talking to itself.
    pub fn new(peers: Vec<usize>, transport: T, config: RegisterConfig) -> Self {
        RoundRegister { peers, transport, config }
    }

    fn quorum(&self) -> usize {
        quorum_size(self.peers.len())
    }

    /// Reads the register at `ballot`. Returns the value carried by the
    /// acknowledgment with the highest `last_write_ballot` once a quorum of
    /// acceptors has promised `ballot`. Aborts with `ReadAbort` on the
    /// first nack, or `Timeout` if a quorum isn't reached within the
    /// configured read deadline.
    pub async fn read(&self, ballot: Ballot) -> Result<Option<T::Value>, Error> {
        let quorum = self.quorum();
        let cancel = CancellationToken::new();
        let (tx, mut rx) = tokio::sync::mpsc::channel(self.peers.len().max(1));

        for &peer in &self.peers {
            let transport = self.transport.clone();
            let tx = tx.clone();
            let cancel = cancel.clone();
            let command = Command::Read(ReadCmd { ballot });
            tokio::spawn(async move {
                let result = transport.make_rpc(peer, command, cancel.clone()).await;
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tx.send(result) => {}
                }
            });
        }
        drop(tx);

        let outcome = tokio::time::timeout(self.config.read_deadline(), async {
            let mut acks = 0usize;
            let mut best: Option<(Ballot, Option<T::Value>)> = None;
            while let Some(result) = rx.recv().await {
                match result {
                    Ok(Response::Read(resp)) => match resp.kind {
                        RespKind::Nack => {
                            return Err(Error::ReadAbort { acceptor: resp.acceptor_id, ballot });
                        }
                        RespKind::Ack => {
                            trace!("read({}) acked by {}", ballot, resp.acceptor_id);
                            if best.as_ref().map_or(true, |(b, _)| resp.last_write_ballot > *b) {
                                best = Some((resp.last_write_ballot, resp.value));
                            }
                            acks += 1;
                            if acks >= quorum {
                                return Ok(best.and_then(|(_, value)| value));
                            }
                        }
                    },
                    Ok(Response::Write(_)) => unreachable!("read phase only expects ReadResp"),
                    Err(_) => {} // transport failure for this peer; tolerated unless it costs us quorum
                }
            }
            // Every peer task has finished without reaching quorum.
            Err(Error::Timeout)
        })
        .await;

        cancel.cancel();
        outcome.unwrap_or(Err(Error::Timeout))
    }

    /// Writes `value` into the register under `ballot`. Succeeds once a
    /// quorum of acceptors has accepted; aborts with `WriteAbort` on the
    /// first nack, or `Timeout` if a quorum isn't reached within the
    /// configured write deadline.
    pub async fn write(&self, ballot: Ballot, value: T::Value) -> Result<(), Error> {
        let quorum = self.quorum();
        let cancel = CancellationToken::new();
        let (tx, mut rx) = tokio::sync::mpsc::channel(self.peers.len().max(1));

        for &peer in &self.peers {
            let transport = self.transport.clone();
            let tx = tx.clone();
            let cancel = cancel.clone();
            let command = Command::Write(WriteCmd { ballot, value: value.clone() });
            tokio::spawn(async move {
                let result = transport.make_rpc(peer, command, cancel.clone()).await;
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tx.send(result) => {}
                }
            });
        }
        drop(tx);

        let outcome = tokio::time::timeout(self.config.write_deadline(), async {
            let mut acks = 0usize;
            while let Some(result) = rx.recv().await {
                match result {
                    Ok(Response::Write(resp)) => match resp.kind {
                        RespKind::Nack => {
                            return Err(Error::WriteAbort { acceptor: resp.acceptor_id, ballot });
                        }
                        RespKind::Ack => {
                            trace!("write({}) acked by {}", ballot, resp.acceptor_id);
                            acks += 1;
                            if acks >= quorum {
                                return Ok(());
                            }
                        }
                    },
                    Ok(Response::Read(_)) => unreachable!("write phase only expects WriteResp"),
                    Err(_) => {}
                }
            }
            Err(Error::Timeout)
        })
        .await;

        cancel.cancel();
        outcome.unwrap_or(Err(Error::Timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quorum_is_majority() {
        assert_eq!(quorum_size(1), 1);
        assert_eq!(quorum_size(2), 2);
        assert_eq!(quorum_size(3), 2);
        assert_eq!(quorum_size(5), 3);
    }
}
