//! # Summary
//!
//! `flease` implements a fault-tolerant distributed lease built on top of a
//! single-shot Paxos round register (the "deconstructed Paxos" synod of
//! Boichat, Dutta, Frölund, and Guerraoui). A fixed set of peers cooperate so
//! that at most one of them holds a time-bounded lease at any instant in real
//! time, tolerating up to `⌊(n-1)/2⌋` simultaneous crash failures without any
//! stable storage.
//!
//! Two layers, each instantiated once per peer process:
//!
//! - [`register::RoundRegister`] / [`acceptor::Acceptor`]: a Paxos synod
//!   acting as a single atomic register over an opaque value, under
//!   monotonic [`ballot::Ballot`]s.
//! - [`lease::Flease`]: uses the register to store a [`lease::Lease`] and
//!   implements the acquire/renew loop, clock-drift quiescence, and the
//!   [`lease::Flease::with_lease`] helper.
//!
//! Peer-to-peer delivery is abstracted behind [`transport::Transport`]; a
//! [`transport::memory::MemoryTransport`] is provided for tests and a
//! [`transport::tcp::TcpTransport`] for real deployments.

#[macro_use]
extern crate derivative;

pub mod acceptor;
pub mod ballot;
pub mod config;
pub mod error;
pub mod internal;
pub mod lease;
pub mod message;
pub mod register;
pub mod transport;

pub use crate::acceptor::Acceptor;
pub use crate::ballot::Ballot;
pub use crate::config::{FleaseConfig, RegisterConfig};
pub use crate::error::Error;
pub use crate::lease::{Flease, Lease};
pub use crate::register::RoundRegister;
pub use crate::transport::Transport;
