//! Integration tests over [`flease::lease::Flease`] backed by
//! [`flease::transport::memory::MemoryTransport`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use flease::ballot::Timestamp;
use flease::config::{FleaseConfig, RegisterConfig};
use flease::lease::Lease;
use flease::transport::memory::MemoryTransport;
use flease::{Acceptor, Ballot, Flease, RoundRegister};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn spawn_cluster(count: usize, config: FleaseConfig) -> Vec<Flease<MemoryTransport<Lease>>> {
    let transports = MemoryTransport::<Lease>::fully_connected(count);
    for (id, transport) in transports.iter().enumerate() {
        Acceptor::spawn(id, transport.clone(), Duration::ZERO);
    }
    let peers: Vec<usize> = (0..count).collect();
    transports
        .into_iter()
        .enumerate()
        .map(|(id, t)| {
            let register = RoundRegister::new(peers.clone(), t, RegisterConfig::new());
            Flease::new(id as u64, register, config)
        })
        .collect()
}

/// S1 — uncontended acquire: the sole caller gets the lease and its expiry
/// is at least `tmax` out from the call.
#[tokio::test]
async fn uncontended_acquire_returns_full_tmax() {
    init_logging();
    let config = FleaseConfig::new()
        .with_epsilon(Duration::from_millis(20))
        .with_tmax(Duration::from_millis(200));
    let cluster = spawn_cluster(3, config);

    let before = flease::ballot::now();
    let lease = cluster[0].get_lease().await;

    assert!(cluster[0].is_holding_lease(&lease));
    assert!(lease.expiry >= before + config.tmax().as_nanos());
}

/// S4 — drift gate: a lease that appears just-expired to our clock, but is
/// still inside its `epsilon` uncertainty window, forces a sleep of at
/// least `epsilon` before a new holder is produced.
#[tokio::test]
async fn drift_gate_delays_reacquisition() {
    init_logging();
    let config = FleaseConfig::new()
        .with_epsilon(Duration::from_millis(20))
        .with_tmax(Duration::from_millis(200));
    let cluster = spawn_cluster(3, config);

    let now = flease::ballot::now();
    let stale = Lease { holder: 99, expiry: now - Duration::from_millis(5).as_nanos() };
    cluster[0].register().write(Ballot::new(0), stale).await.unwrap();

    let start = Instant::now();
    let lease = cluster[1].try_get_lease().await.unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(15), "drift gate did not delay reacquisition: {:?}", elapsed);
    assert_eq!(lease.holder, 1);
}

/// S2 — contended mutual exclusion: three peers race to acquire; whenever
/// one believes itself the holder, no other peer's previously observed
/// lease is simultaneously valid under a different holder.
#[tokio::test]
async fn contended_peers_never_hold_simultaneously() {
    init_logging();
    let config = FleaseConfig::new()
        .with_epsilon(Duration::from_millis(5))
        .with_tmax(Duration::from_millis(50));
    let cluster = spawn_cluster(3, config);

    let believed_holder: Arc<Mutex<HashMap<u64, Timestamp>>> = Arc::new(Mutex::new(HashMap::new()));

    let mut handles = Vec::new();
    for flease in cluster {
        let believed_holder = Arc::clone(&believed_holder);
        handles.push(tokio::spawn(async move {
            for _ in 0..15 {
                let lease = flease.get_lease().await;
                let now = flease::ballot::now();
                {
                    let mut table = believed_holder.lock();
                    for (&holder, &expiry) in table.iter() {
                        if holder != lease.holder && expiry > now {
                            panic!("peers {} and {} both believe they hold a valid lease", holder, lease.holder);
                        }
                    }
                    table.insert(lease.holder, lease.expiry);
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}
