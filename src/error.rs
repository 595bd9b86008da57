//! # Summary
//!
//! Error taxonomy for the round register and lease layers. Kinds mirror the
//! ones spec'd out for this protocol: a proposer retries on every variant
//! except `Cancelled`, which only ever surfaces when the caller itself tore
//! down a phase early.

/// Errors a [`crate::register::RoundRegister`] phase or [`crate::lease::Flease`]
/// operation can produce.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// At least one acceptor rejected our ballot during a read. Retry with a
    /// fresh ballot.
    #[error("read aborted: acceptor {acceptor} rejected ballot {ballot}")]
    ReadAbort { acceptor: usize, ballot: crate::ballot::Ballot },

    /// At least one acceptor rejected our ballot during a write. Retry.
    #[error("write aborted: acceptor {acceptor} rejected ballot {ballot}")]
    WriteAbort { acceptor: usize, ballot: crate::ballot::Ballot },

    /// A quorum was not reached within the phase deadline.
    #[error("quorum not reached within deadline")]
    Timeout,

    /// A specific peer could not be reached. Tolerated unless it prevents
    /// quorum, in which case the caller observes `Timeout` instead.
    #[error("peer {0} unreachable")]
    TransportFailure(usize),

    /// The acceptor received a command it could not interpret. Fatal to the
    /// specific RPC; never surfaced past the acceptor boundary.
    #[error("malformed command received")]
    UnknownCommand,

    /// The calling scope tore down the phase (its cancellation token fired)
    /// before a result was available.
    #[error("phase cancelled")]
    Cancelled,
}
