//! # Summary
//!
//! Wire message and command shapes for round-register RPCs: a single READ
//! and a single WRITE round, rather than a per-slot multi-phase exchange,
//! since a round register only ever decides one value. The value carried by
//! `WriteCmd`/`ReadResp` is opaque to the register; `flease` is simply the
//! first caller to instantiate it with [`crate::lease::Lease`].

use serde::{Deserialize, Serialize};

use crate::ballot::Ballot;

/// Query from a proposer to an acceptor requesting a promise at `ballot`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadCmd {
    pub ballot: Ballot,
}

/// Query from a proposer to an acceptor asking it to accept `value` at `ballot`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteCmd<V> {
    pub ballot: Ballot,
    pub value: V,
}

/// Whether an acceptor honored or rejected the associated ballot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RespKind {
    Ack,
    Nack,
}

/// Response from an acceptor to a read phase.
///
/// On `Ack`, carries the highest ballot this acceptor had previously
/// accepted a write under (`last_write_ballot`) and the value written then,
/// so the proposer can adopt the most recently written value across the
/// quorum.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadResp<V> {
    pub acceptor_id: usize,
    pub kind: RespKind,
    pub ballot: Ballot,
    pub last_write_ballot: Ballot,
    pub value: Option<V>,
}

/// Response from an acceptor to a write phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResp {
    pub acceptor_id: usize,
    pub kind: RespKind,
    pub ballot: Ballot,
}

/// The two commands an acceptor can receive, wrapped for dispatch through
/// a single transport-level RPC.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command<V> {
    Read(ReadCmd),
    Write(WriteCmd<V>),
}

/// The two responses an acceptor can send back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response<V> {
    Read(ReadResp<V>),
    Write(WriteResp),
}
