//! # Summary
//!
//! This module defines [`Lease`], the value a [`crate::register::RoundRegister`]
//! stores, and [`Flease`], the acquire/renew/hold API built on top of it:
//! sample the clock, read the register, apply the drift gate, decide on a
//! candidate, and write the decision back unconditionally. [`Flease::with_lease`]
//! layers a periodic renewal task on top so a held lease survives closures
//! that outlive a single `tmax` window.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::ballot::{self, Ballot, Timestamp};
use crate::config::FleaseConfig;
use crate::error::Error;
use crate::register::RoundRegister;
use crate::transport::Transport;

/// The value a [`Flease`] stores in its underlying register: who holds the
/// lease, and when it expires (nanoseconds since the Unix epoch, same clock
/// as [`Ballot::proposal_no`]).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub holder: u64,
    pub expiry: Timestamp,
}

impl Lease {
    fn is_valid_at(&self, now: Timestamp) -> bool {
        now < self.expiry
    }
}

/// Distributed lease built on a [`RoundRegister<T>`] whose value is a
/// [`Lease`]. One instance is owned per peer process; `id` both identifies
/// this peer as a prospective holder and seeds the ballots it proposes.
#[derive(Clone)]
pub struct Flease<T: Transport<Value = Lease>> {
    id: u64,
    register: RoundRegister<T>,
    config: FleaseConfig,
}

impl<T: Transport<Value = Lease>> Flease<T> {
    pub fn new(id: u64, register: RoundRegister<T>, config: FleaseConfig) -> Self {
        Flease { id, register, config }
    }

    /// The underlying round register, for callers that need to inspect or
    /// seed register state directly (e.g. test harnesses).
    pub fn register(&self) -> &RoundRegister<T> {
        &self.register
    }

    /// Reports whether `lease` is still valid at the current wall-clock time.
    pub fn is_lease_valid(&self, lease: &Lease) -> bool {
        lease.is_valid_at(ballot::now())
    }

    /// Reports whether this peer is the current holder of a still-valid lease.
    pub fn is_holding_lease(&self, lease: &Lease) -> bool {
        lease.holder == self.id && self.is_lease_valid(lease)
    }

    /// Runs one acquisition attempt to completion, including any drift-gate
    /// waits: sample `now`, read the register, decide on a candidate
    /// (extend if we already hold it, take it if expired or absent, leave
    /// it alone if a foreign lease is still valid), and write the decision
    /// back unconditionally — even when we are not the resulting holder, so
    /// that a live holder's lease is propagated to a quorum that may not
    /// have seen it yet.
    ///
    /// On a `ReadAbort`/`WriteAbort`/`Timeout`, the caller is expected to
    /// retry with a fresh ballot; this method does not retry those itself,
    /// only the drift gate's internal wait-and-resample.
    pub async fn try_get_lease(&self) -> Result<Lease, Error> {
        loop {
            let ballot = Ballot::new(self.id);
            let now = ballot.proposal_no;

            let observed = self.register.read(ballot).await?;

            if let Some(lease) = observed {
                if now > lease.expiry && now < lease.expiry + self.config.epsilon().as_nanos() {
                    // The previous holder may still believe it holds the
                    // lease within its own clock's epsilon; wait out the
                    // uncertainty window and resample before deciding.
                    trace!("peer {} drift-gate sleeping on {:?}", self.id, lease);
                    tokio::time::sleep(self.config.epsilon()).await;
                    continue;
                }
            }

            let candidate = match observed {
                Some(lease) if lease.holder == self.id && lease.is_valid_at(now) => Lease {
                    holder: self.id,
                    expiry: now + self.config.tmax().as_nanos(),
                },
                Some(lease) if lease.is_valid_at(now) => lease,
                _ => Lease {
                    holder: self.id,
                    expiry: now + self.config.tmax().as_nanos(),
                },
            };

            self.register.write(ballot, candidate).await?;
            debug!("peer {} wrote lease {:?} at ballot {}", self.id, candidate, ballot);
            return Ok(candidate);
        }
    }

    /// Retries [`Flease::try_get_lease`] until it succeeds, drawing a fresh
    /// ballot on every abort/timeout.
    pub async fn get_lease(&self) -> Lease {
        loop {
            match self.try_get_lease().await {
                Ok(lease) => {
                    info!("peer {} observes lease held by {} until {}", self.id, lease.holder, lease.expiry);
                    return lease;
                }
                Err(error) => trace!("peer {} retrying after {}", self.id, error),
            }
        }
    }

    /// Acquires the lease and, once held, invokes the closure with a
    /// one-shot signal that fires at the currently tracked expiry: every
    /// time the background renewal task extends the lease, the deadline the
    /// signal fires at moves out with it, so the signal only actually fires
    /// once the lease truly lapses — either because renewal lost it to
    /// another peer, or because the deadline was reached without a fresh
    /// renewal landing in time. If the observed lease belongs to someone
    /// else, sleeps until it expires and retries acquisition. Returns the
    /// last expiry this peer renewed the lease to.
    ///
    /// The renewal task sleeps `(expiry - now) / 2` between attempts, so a
    /// held lease is kept alive across calls that run longer than a single
    /// `tmax` window; the closure itself decides when to stop. The renewal
    /// task is always stopped before `with_lease` returns.
    pub async fn with_lease<F, Fut>(&self, f: F) -> Timestamp
    where
        F: FnOnce(oneshot::Receiver<()>) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        loop {
            let lease = self.get_lease().await;

            if !self.is_holding_lease(&lease) {
                let now = ballot::now();
                if lease.expiry > now {
                    tokio::time::sleep(Duration::from_nanos((lease.expiry - now) as u64)).await;
                }
                continue;
            }

            let expiry = Arc::new(Mutex::new(lease.expiry));
            let (timeout_tx, timeout_rx) = oneshot::channel();
            let renewal = self.spawn_renewal(lease, Arc::clone(&expiry), timeout_tx);

            f(timeout_rx).await;

            renewal.abort();
            return *expiry.lock();
        }
    }

    /// Renews `lease` every `(expiry - now) / 2`, updating `expiry` on every
    /// success. Sends on `timeout` and stops the instant either (a) another
    /// peer is observed holding the register, or (b) the tracked expiry is
    /// reached without a fresh renewal having landed first — i.e. exactly
    /// when the lease `with_lease` promised the closure has actually lapsed.
    fn spawn_renewal(
        &self,
        mut lease: Lease,
        expiry: Arc<Mutex<Timestamp>>,
        timeout: oneshot::Sender<()>,
    ) -> tokio::task::JoinHandle<()> {
        let id = self.id;
        let register = self.register.clone();
        let config = self.config;

        tokio::spawn(async move {
            let flease = Flease { id, register, config };
            loop {
                let now = ballot::now();
                if now >= lease.expiry {
                    warn!("peer {} lease expired at {} before renewal landed", id, lease.expiry);
                    let _ = timeout.send(());
                    return;
                }

                let remaining = lease.expiry - now;
                tokio::time::sleep(Duration::from_nanos(remaining as u64) / 2).await;

                match flease.try_get_lease().await {
                    Ok(renewed) if renewed.holder == id => {
                        trace!("peer {} renewed lease to {}", id, renewed.expiry);
                        lease = renewed;
                        *expiry.lock() = renewed.expiry;
                    }
                    Ok(lost_lease) => {
                        warn!("peer {} lost lease to {}", id, lost_lease.holder);
                        let _ = timeout.send(());
                        return;
                    }
                    Err(error) => warn!("peer {} renewal attempt failed: {}", id, error),
                }
            }
        })
    }
}
