//! Integration tests over [`flease::register::RoundRegister`] and
//! [`flease::acceptor::Acceptor`] backed by [`flease::transport::memory::MemoryTransport`].

use std::time::Duration;

use flease::config::RegisterConfig;
use flease::error::Error;
use flease::message::{Command, ReadCmd};
use flease::transport::memory::MemoryTransport;
use flease::transport::Transport;
use flease::{Acceptor, Ballot, RoundRegister};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn spawn_cluster(count: usize) -> Vec<RoundRegister<MemoryTransport<u32>>> {
    let transports = MemoryTransport::<u32>::fully_connected(count);
    for (id, transport) in transports.iter().enumerate() {
        Acceptor::spawn(id, transport.clone(), Duration::ZERO);
    }
    let peers: Vec<usize> = (0..count).collect();
    transports
        .into_iter()
        .map(|t| RoundRegister::new(peers.clone(), t, RegisterConfig::new()))
        .collect()
}

/// Invariant 6 (round-trip fidelity) and invariant 3 (register
/// linearizability): a value written by a quorum is returned unchanged by
/// a subsequent majority read.
#[tokio::test]
async fn write_then_read_is_bit_identical() {
    init_logging();
    let registers = spawn_cluster(3);
    let ballot = Ballot::new(0);
    registers[0].write(ballot, 42).await.unwrap();

    let next = Ballot::new(1);
    let value = registers[1].read(next).await.unwrap();
    assert_eq!(value, Some(42));
}

/// An empty register reads back `None`.
#[tokio::test]
async fn unwritten_register_reads_none() {
    init_logging();
    let registers = spawn_cluster(3);
    let value = registers[0].read(Ballot::new(0)).await.unwrap();
    assert_eq!(value, None);
}

/// S3 — quorum survival: with two of five acceptors never started, the
/// remaining three still reach quorum on both phases.
#[tokio::test]
async fn quorum_survives_minority_failures() {
    init_logging();
    let transports = MemoryTransport::<u32>::fully_connected(5);
    // Only spawn acceptors for peers 0, 1, 2 — 3 and 4 are "dead": they never
    // drain their consumer channel, so RPCs addressed to them simply never
    // complete and are discarded on cancellation once quorum is reached.
    for (id, transport) in transports.iter().enumerate().take(3) {
        Acceptor::spawn(id, transport.clone(), Duration::ZERO);
    }
    let peers: Vec<usize> = (0..5).collect();
    let registers: Vec<_> = transports
        .into_iter()
        .map(|t| RoundRegister::new(peers.clone(), t, RegisterConfig::new()))
        .collect();

    let ballot = Ballot::new(0);
    registers[0].write(ballot, 7).await.unwrap();
    let value = registers[1].read(Ballot::new(1)).await.unwrap();
    assert_eq!(value, Some(7));
}

/// S6 — ballot tie: two proposers draw ballots with identical `proposal_no`;
/// the higher `proposer_id` wins, the lower is nack-read.
#[tokio::test]
async fn ballot_tie_favors_higher_proposer_id() {
    init_logging();
    let transports = MemoryTransport::<u32>::fully_connected(3);
    for (id, transport) in transports.iter().enumerate() {
        Acceptor::spawn(id, transport.clone(), Duration::ZERO);
    }

    let proposal_no = 1_000;
    let low = Ballot { proposal_no, proposer_id: 1 };
    let high = Ballot { proposal_no, proposer_id: 2 };

    // The higher ballot reads first and is promised by every acceptor.
    let result = transports[0]
        .make_rpc(0, Command::Read(ReadCmd { ballot: high }), tokio_util::sync::CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(result, flease::message::Response::Read(resp) if resp.kind == flease::message::RespKind::Ack));

    // The tied-but-lower ballot is now nacked at that same acceptor.
    let result = transports[0]
        .make_rpc(0, Command::Read(ReadCmd { ballot: low }), tokio_util::sync::CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(result, flease::message::Response::Read(resp) if resp.kind == flease::message::RespKind::Nack));
}

/// S5 — crash recovery: while an acceptor is in its boot-quiescence window,
/// it produces no response at all; only after the window elapses does it
/// begin serving.
#[tokio::test]
async fn acceptor_is_silent_through_boot_quiescence() {
    init_logging();
    let transports = MemoryTransport::<u32>::fully_connected(1);
    Acceptor::spawn(0, transports[0].clone(), Duration::from_millis(150));

    let cancel = tokio_util::sync::CancellationToken::new();
    let pending = transports[0].make_rpc(0, Command::Read(ReadCmd { ballot: Ballot::new(0) }), cancel.clone());

    // No response within 50ms: the acceptor hasn't started draining its
    // consumer channel yet.
    let early = tokio::time::timeout(Duration::from_millis(50), pending).await;
    assert!(early.is_err(), "acceptor responded before its boot-quiescence window elapsed");
    cancel.cancel();

    // After the window elapses, a fresh request succeeds.
    let response = transports[0]
        .make_rpc(0, Command::Read(ReadCmd { ballot: Ballot::new(0) }), tokio_util::sync::CancellationToken::new())
        .await;
    assert!(response.is_ok());
}

/// A nack-read produces `ReadAbort` at the register layer.
#[tokio::test]
async fn nacked_read_aborts() {
    init_logging();
    let registers = spawn_cluster(3);
    let low = Ballot { proposal_no: 100, proposer_id: 0 };
    let high = Ballot { proposal_no: 200, proposer_id: 0 };

    registers[0].read(high).await.unwrap();
    let result = registers[0].read(low).await;
    assert!(matches!(result, Err(Error::ReadAbort { .. })));
}
